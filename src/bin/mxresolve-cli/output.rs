use anyhow::{Result, bail};
use mxresolve_lib::ResolvedSet;

#[cfg_attr(feature = "with-serde", derive(serde::Serialize))]
pub struct ExchangerRow {
    pub ipv4: Vec<String>,
    pub ipv6: Vec<String>,
}

#[cfg_attr(feature = "with-serde", derive(serde::Serialize))]
pub struct Report {
    pub host: String,
    pub exchanger_count: usize,
    pub recipients: Vec<String>,
    pub exchangers: Vec<ExchangerRow>,
}

impl Report {
    pub fn new(host: &str, set: &ResolvedSet) -> Self {
        Self {
            host: host.to_string(),
            exchanger_count: set.exchanger_count(),
            recipients: set
                .recipients()
                .map(|r| String::from_utf8_lossy(r).into_owned())
                .collect(),
            exchangers: (0..set.exchanger_count())
                .map(|i| ExchangerRow {
                    ipv4: set.ipv4(i).map(|ip| ip.to_string()).collect(),
                    ipv6: set.ipv6(i).map(|ip| ip.to_string()).collect(),
                })
                .collect(),
        }
    }
}

pub fn print(report: &Report, format: &str) -> Result<()> {
    print!("{}", render(report, format)?);
    Ok(())
}

pub fn render(report: &Report, format: &str) -> Result<String> {
    match format {
        "human" => Ok(render_human(report)),
        "json" => render_json(report),
        other => bail!("unknown --format '{other}', use: human|json"),
    }
}

fn render_human(report: &Report) -> String {
    let mut out = format!(
        "host: {} ({} exchanger(s))\n",
        report.host, report.exchanger_count
    );
    for r in &report.recipients {
        out.push_str(&format!("  rcpt  {r}\n"));
    }
    for (i, mx) in report.exchangers.iter().enumerate() {
        // IPv6 d'abord, comme l'ordre de connexion
        let all: Vec<&str> = mx.ipv6.iter().chain(&mx.ipv4).map(String::as_str).collect();
        if all.is_empty() {
            out.push_str(&format!("  mx[{i}] <no address>\n"));
        } else {
            out.push_str(&format!("  mx[{i}] {}\n", all.join(" ")));
        }
    }
    out
}

#[cfg(feature = "with-serde")]
fn render_json(report: &Report) -> Result<String> {
    Ok(format!("{}\n", serde_json::to_string_pretty(report)?))
}

#[cfg(not(feature = "with-serde"))]
fn render_json(_report: &Report) -> Result<String> {
    bail!("format=json nécessite la feature 'with-serde'")
}
