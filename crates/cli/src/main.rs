use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::signal;
use tracing::{info, warn};
use tsingress_core::{Kind, StoreConfig, WatchEvent};
use tsingress_resources::annotations::CLASS_TRAFFICSERVER;
use tsingress_resources::{parse, Ingress, IngressBackend, IngressPolicy, Resource, Secret, TlsContext};
use tsingress_store::{spawn_ingest, Backend, Cluster, Namespace, SharedCluster};

#[derive(Parser, Debug)]
#[command(name = "tsictl", version, about = "Inspect Traffic Server ingress state")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    /// Only report this namespace
    #[arg(long = "ns", global = true)]
    namespace: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output {
    Human,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a recorded watch stream (one JSON envelope per line) and report the resulting state
    Replay {
        /// File to read, or "-" for stdin
        file: PathBuf,
        /// Ingress class whose routes are reported
        #[arg(long = "class", default_value = CLASS_TRAFFICSERVER)]
        class: String,
        /// Report ingresses of every class
        #[arg(long = "all-classes", action = ArgAction::SetTrue)]
        all_classes: bool,
    },
    /// Parse one resource document and print the entity
    Parse {
        /// Ingress, Service, Endpoints or Secret
        #[arg(value_parser = Kind::from_str)]
        kind: Kind,
        file: PathBuf,
    },
    /// Derive annotation policy from an Ingress document
    Policy { file: PathBuf },
    /// Build a TLS context from a Secret document
    Tls { file: PathBuf },
}

fn init_tracing() {
    let env = std::env::var("TSI_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("TSI_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(()) => info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            warn!(addr = %addr, "invalid TSI_METRICS_ADDR; expected host:port");
        }
    }
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf).context("reading stdin")?;
        return Ok(buf);
    }
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn read_json(path: &Path) -> Result<Value> {
    let text = read_input(path)?;
    serde_json::from_str(&text).with_context(|| format!("parsing {} as JSON", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();

    match cli.command {
        Commands::Replay {
            ref file,
            ref class,
            all_classes,
        } => {
            let class = (!all_classes).then_some(class.as_str());
            info!(file = %file.display(), class = ?class, "replay invoked");
            let (cluster, malformed) = replay(file, StoreConfig::from_env()).await?;
            let report = Report::build(&cluster.read(), cli.namespace.as_deref(), class, malformed);
            match cli.output {
                Output::Human => report.print(),
                Output::Json => print_json(&report)?,
            }
            match cluster.try_unwrap() {
                Ok(cluster) => {
                    cluster.teardown();
                }
                Err(_) => warn!("cluster still shared at shutdown"),
            }
        }
        Commands::Parse { kind, ref file } => {
            let text = read_input(file)?;
            let resource = parse(kind, &text).with_context(|| format!("parsing {} as {kind}", file.display()))?;
            match cli.output {
                Output::Human => print_summary(&resource),
                Output::Json => print_json(&resource)?,
            }
        }
        Commands::Policy { ref file } => {
            let ingress = Ingress::parse(&read_json(file)?).context("parsing Ingress")?;
            let policy = IngressPolicy::from_ingress(&ingress)
                .with_context(|| format!("ingress {}/{}", ingress.namespace(), ingress.name()))?;
            match cli.output {
                Output::Human => {
                    println!("{}/{}", ingress.namespace(), ingress.name());
                    println!("  {:<24} {}", "class", ingress.ingress_class().unwrap_or("-"));
                    if let Value::Object(fields) = serde_json::to_value(&policy)? {
                        for (k, v) in fields.iter().filter(|(_, v)| !v.is_null()) {
                            println!("  {k:<24} {v}");
                        }
                    }
                }
                Output::Json => print_json(&json!({
                    "ingress": format!("{}/{}", ingress.namespace(), ingress.name()),
                    "class": ingress.ingress_class(),
                    "policy": policy,
                }))?,
            }
        }
        Commands::Tls { ref file } => {
            let secret = Secret::parse(&read_json(file)?).context("parsing Secret")?;
            let ctx = TlsContext::from_secret(&secret)?;
            match cli.output {
                Output::Human => println!("{}: {} certificate(s)", ctx.origin(), ctx.certificates().len()),
                Output::Json => print_json(&json!({
                    "origin": ctx.origin(),
                    "certificates": ctx.certificates().len(),
                }))?,
            }
        }
    }
    Ok(())
}

/// Feeds every envelope in `file` through the ingest loop and waits for it
/// to drain. Returns the cluster and the number of unreadable lines.
async fn replay(file: &Path, config: StoreConfig) -> Result<(SharedCluster, usize)> {
    let text = read_input(file)?;
    let (tx, handle) = spawn_ingest(config);
    let mut malformed = 0usize;

    let feed = async {
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let event = serde_json::from_str::<Value>(line)
                .map_err(anyhow::Error::from)
                .and_then(|v| Ok(WatchEvent::from_wire(&v)?));
            match event {
                Ok(ev) => {
                    if tx.send(ev).await.is_err() {
                        warn!("ingest loop stopped early");
                        break;
                    }
                }
                Err(e) => {
                    warn!(line = idx + 1, error = %e, "skipping malformed line");
                    malformed += 1;
                }
            }
        }
    };
    tokio::select! {
        _ = feed => {}
        _ = signal::ctrl_c() => warn!("interrupted; reporting what was read so far"),
    }

    drop(tx);
    Ok((handle.join().await, malformed))
}

#[derive(Debug, Serialize)]
struct NamespaceRow {
    namespace: String,
    ingresses: usize,
    services: usize,
    endpoints: usize,
    secrets: usize,
}

#[derive(Debug, Serialize)]
struct RouteRow {
    ingress: String,
    host: String,
    path: String,
    backend: String,
    status: String,
    age: String,
}

#[derive(Debug, Serialize)]
struct TlsRow {
    ingress: String,
    secret: String,
    hosts: Vec<String>,
    status: String,
}

#[derive(Debug, Serialize)]
struct PolicyRow {
    ingress: String,
    error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    namespaces: Vec<NamespaceRow>,
    routes: Vec<RouteRow>,
    tls: Vec<TlsRow>,
    policy_errors: Vec<PolicyRow>,
    malformed_lines: usize,
}

impl Report {
    fn build(cluster: &Cluster, only: Option<&str>, class: Option<&str>, malformed_lines: usize) -> Self {
        let mut namespaces: Vec<&Namespace> = cluster
            .namespaces()
            .values()
            .filter(|ns| only.map_or(true, |n| ns.name() == n))
            .collect();
        namespaces.sort_by(|a, b| a.name().cmp(b.name()));

        let mut report = Report {
            namespaces: Vec::new(),
            routes: Vec::new(),
            tls: Vec::new(),
            policy_errors: Vec::new(),
            malformed_lines,
        };
        for ns in namespaces {
            report.namespaces.push(NamespaceRow {
                namespace: ns.name().to_string(),
                ingresses: ns.count(Kind::Ingress),
                services: ns.count(Kind::Service),
                endpoints: ns.count(Kind::Endpoints),
                secrets: ns.count(Kind::Secret),
            });

            let mut ingresses: Vec<&Ingress> = ns
                .ingresses()
                .values()
                .filter(|ing| class.map_or(true, |c| ing.is_handled_by(c)))
                .collect();
            ingresses.sort_by(|a, b| a.name().cmp(b.name()));
            for ing in ingresses {
                report.add_ingress(ns, ing);
            }
        }
        report
    }

    fn add_ingress(&mut self, ns: &Namespace, ing: &Ingress) {
        let id = format!("{}/{}", ns.name(), ing.name());
        let age = render_age(ing.meta.creation_ts);
        let route = |host: &str, path: &str, backend: &IngressBackend| RouteRow {
            ingress: id.clone(),
            host: if host.is_empty() { "*".to_string() } else { host.to_string() },
            path: if path.is_empty() { "/".to_string() } else { path.to_string() },
            backend: backend.to_string(),
            status: describe(&ns.resolve(backend)),
            age: age.clone(),
        };

        let mut rows = Vec::new();
        for rule in ing.rules.iter() {
            for p in rule.paths.iter() {
                rows.push(route(&rule.host, &p.path, &p.backend));
            }
        }
        if let Some(backend) = &ing.default_backend {
            rows.push(route("", "", backend));
        }
        self.routes.extend(rows);

        for binding in ing.tls.iter() {
            let status = match ns.tls_context_for(binding) {
                Ok(ctx) => format!("ok ({} certificate(s))", ctx.certificates().len()),
                Err(e) => format!("error: {e}"),
            };
            self.tls.push(TlsRow {
                ingress: id.clone(),
                secret: binding.secret_name.clone(),
                hosts: binding.hosts.to_vec(),
                status,
            });
        }

        if let Err(e) = IngressPolicy::from_ingress(ing) {
            self.policy_errors.push(PolicyRow {
                ingress: id,
                error: e.to_string(),
            });
        }
    }

    fn print(&self) {
        println!("NAMESPACE            INGRESSES  SERVICES  ENDPOINTS  SECRETS");
        for r in &self.namespaces {
            println!(
                "{:<20} {:<10} {:<9} {:<10} {}",
                r.namespace, r.ingresses, r.services, r.endpoints, r.secrets
            );
        }
        if !self.routes.is_empty() {
            println!();
            println!("INGRESS                   HOST                      PATH            BACKEND              AGE     STATUS");
            for r in &self.routes {
                println!(
                    "{:<25} {:<25} {:<15} {:<20} {:<7} {}",
                    r.ingress, r.host, r.path, r.backend, r.age, r.status
                );
            }
        }
        if !self.tls.is_empty() {
            println!();
            for t in &self.tls {
                println!("tls {} {} [{}] {}", t.ingress, t.secret, t.hosts.join(","), t.status);
            }
        }
        for p in &self.policy_errors {
            println!("policy {}: {}", p.ingress, p.error);
        }
        if self.malformed_lines > 0 {
            println!("{} malformed line(s) skipped", self.malformed_lines);
        }
    }
}

fn describe(backend: &Backend<'_>) -> String {
    match backend {
        Backend::Resolved(b) => format!("{} endpoint(s)", b.addresses.len()),
        Backend::External { host, .. } => format!("external {host}"),
        Backend::Dangling(d) => format!("dangling: {d}"),
    }
}

fn print_summary(resource: &Resource) {
    println!("{}", resource.key());
    match resource {
        Resource::Ingress(ing) => {
            println!("  rules: {}  tls: {}", ing.rules.len(), ing.tls.len());
            for rule in ing.rules.iter() {
                for p in rule.paths.iter() {
                    let host = if rule.host.is_empty() { "*" } else { &rule.host };
                    println!("  {host}{} -> {}", p.path, p.backend);
                }
            }
        }
        Resource::Service(svc) => {
            println!("  type: {}  clusterIP: {}", svc.service_type, svc.cluster_ip);
            for p in svc.ports.values() {
                println!("  port {:?} {} {}", p.name, p.port, p.protocol);
            }
        }
        Resource::Endpoints(ep) => {
            for s in ep.subsets.iter() {
                println!(
                    "  subset: {} ready, {} not ready, {} port(s)",
                    s.addresses.len(),
                    s.not_ready_addresses.len(),
                    s.ports.len()
                );
            }
        }
        Resource::Secret(secret) => {
            println!("  type: {}", secret.secret_type);
            for k in secret.data.keys() {
                println!("  data {k}");
            }
        }
    }
}

fn render_age(creation_ts: i64) -> String {
    if creation_ts <= 0 {
        return "-".to_string();
    }
    let mut secs = (chrono::Utc::now().timestamp() - creation_ts).max(0) as u64;
    let days = secs / 86_400;
    secs %= 86_400;
    let hours = secs / 3600;
    secs %= 3600;
    let mins = secs / 60;
    secs %= 60;
    if days > 0 {
        format!("{days}d{hours}h")
    } else if hours > 0 {
        format!("{hours}h{mins}m")
    } else if mins > 0 {
        format!("{mins}m")
    } else {
        format!("{secs}s")
    }
}
