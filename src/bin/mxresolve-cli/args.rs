use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use mxresolve_lib::ResolveOptions;

#[derive(Parser)]
#[command(name = "mxresolve-cli")]
pub struct Cli {
    /// hôte de destination (domaine MX, ou relais avec --direct)
    pub host: String,

    /// adresses de l'enveloppe (expéditeur puis destinataires)
    pub addresses: Vec<String>,

    /// budget DNS global (ms); 0 = valeur par défaut
    #[arg(long = "timeout-ms", default_value_t = 60_000)]
    pub timeout_ms: u64,

    /// contourne le MX et livre à l'hôte lui-même (smtproutes)
    #[arg(long)]
    pub direct: bool,

    /// n'interroge pas les AAAA
    #[arg(long = "no-ipv6")]
    pub no_ipv6: bool,

    /// fichier des adresses locales (format control/ipme)
    #[arg(long)]
    pub ipme: Option<PathBuf>,

    /// serveur DNS récursif (par défaut: configuration système)
    #[arg(long = "nameserver")]
    pub nameservers: Vec<SocketAddr>,

    /// format: human|json
    #[arg(long, default_value = "human")]
    pub format: String,

    /// logs de debug sur stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn options(&self) -> ResolveOptions {
        let mut options = ResolveOptions::new()
            .with_timeout_ms(self.timeout_ms)
            .with_direct(self.direct)
            .with_ipv6(!self.no_ipv6);
        for ns in &self.nameservers {
            options = options.with_nameserver(*ns);
        }
        options
    }
}
