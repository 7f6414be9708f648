use std::{env, fs, process};

use serde::Deserialize;

use contextgraph::{
    ChangeKind, ContextAnalytics, Entity, PatternQuery, Relationship,
};

#[derive(Clone, Debug, PartialEq)]
struct CommandLineConfig {
    graph_file: Option<String>,
    command: String,
    entity: Option<i64>,
    change: String,
    hops: Option<u32>,
}

impl CommandLineConfig {
    fn from_args(args: &[&str]) -> Result<Self, String> {
        let mut graph_file = None;
        let mut command = String::from("status");
        let mut entity = None;
        let mut change = String::from("modify");
        let mut hops = None;
        let mut iter = args.iter().skip(1);
        while let Some(arg) = iter.next() {
            match *arg {
                "--graph" => {
                    graph_file = Some(
                        iter.next()
                            .ok_or_else(|| "--graph requires a value".to_string())?
                            .to_string(),
                    );
                }
                "--entity" => {
                    let value = iter
                        .next()
                        .ok_or_else(|| "--entity requires a value".to_string())?;
                    entity = Some(
                        value
                            .parse::<i64>()
                            .map_err(|_| format!("invalid entity id {value}"))?,
                    );
                }
                "--change" => {
                    change = iter
                        .next()
                        .ok_or_else(|| "--change requires a value".to_string())?
                        .to_string();
                }
                "--hops" => {
                    let value = iter
                        .next()
                        .ok_or_else(|| "--hops requires a value".to_string())?;
                    hops = Some(
                        value
                            .parse::<u32>()
                            .map_err(|_| format!("invalid hop count {value}"))?,
                    );
                }
                other if other.starts_with('-') => {
                    return Err(format!("unknown flag {other}"));
                }
                _ => {
                    command = arg.to_string();
                }
            }
        }
        Ok(Self {
            graph_file,
            command,
            entity,
            change,
            hops,
        })
    }

    fn help() -> &'static str {
        "Usage: contextgraph --graph FILE [status|centrality|impact|recommend]\n\
         \n\
         Commands:\n\
           status      entity and relationship counts\n\
           centrality  per-entity centrality scores and strategic value\n\
           impact      blast radius (requires --entity ID, optional --change KIND, --hops N)\n\
           recommend   relationship recommendations\n"
    }
}

#[derive(Deserialize)]
struct GraphFile {
    entities: Vec<Entity>,
    #[serde(default)]
    relationships: Vec<Relationship>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        println!("{}", CommandLineConfig::help());
        return;
    }
    let arg_refs: Vec<&str> = args.iter().map(|s| s.as_str()).collect();
    let config = match CommandLineConfig::from_args(&arg_refs) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("error: {err}");
            process::exit(2);
        }
    };

    let analytics = match load_analytics(&config) {
        Ok(analytics) => analytics,
        Err(err) => {
            eprintln!("error: {err}");
            process::exit(2);
        }
    };

    if let Err(err) = run_command(&analytics, &config) {
        eprintln!("command failed: {err}");
        process::exit(1);
    }
}

fn load_analytics(config: &CommandLineConfig) -> Result<ContextAnalytics, String> {
    let path = config
        .graph_file
        .as_deref()
        .ok_or_else(|| "--graph FILE is required".to_string())?;
    let raw = fs::read_to_string(path).map_err(|e| format!("{path}: {e}"))?;
    let file: GraphFile = serde_json::from_str(&raw).map_err(|e| format!("{path}: {e}"))?;
    let analytics = ContextAnalytics::new();
    for entity in &file.entities {
        analytics
            .graph()
            .insert_entity(entity)
            .map_err(|e| e.to_string())?;
    }
    for rel in &file.relationships {
        analytics
            .graph()
            .insert_relationship(rel)
            .map_err(|e| e.to_string())?;
    }
    Ok(analytics)
}

fn run_command(analytics: &ContextAnalytics, config: &CommandLineConfig) -> Result<(), String> {
    match config.command.as_str() {
        "status" => {
            println!(
                "entities={} relationships={} version={}",
                analytics.graph().entity_count(),
                analytics.graph().relationship_count(),
                analytics.graph().version()
            );
            Ok(())
        }
        "centrality" => {
            let report = analytics.centrality().map_err(|e| e.to_string())?;
            for scores in &report.scores {
                println!(
                    "{}: degree={:.1} closeness={:.1} betweenness={:.1} eigenvector={:.1} pagerank={:.1} strategic={:.1}",
                    scores.entity_id,
                    scores.degree,
                    scores.closeness,
                    scores.betweenness,
                    scores.eigenvector,
                    scores.pagerank,
                    scores.strategic_value
                );
            }
            if report.partial {
                println!("partial=true");
            }
            Ok(())
        }
        "impact" => {
            let entity = config.entity.ok_or("--entity ID is required for impact")?;
            let change = ChangeKind::parse(&config.change)
                .ok_or_else(|| format!("unknown change kind {}", config.change))?;
            let report = analytics
                .impact(entity, change, config.hops)
                .map_err(|e| e.to_string())?;
            for affected in &report.affected {
                println!(
                    "{}: hops={} level={} score={:.1}",
                    affected.entity_id,
                    affected.hops,
                    affected.level.as_str(),
                    affected.score
                );
            }
            println!(
                "aggregate={:.1} severity={} probability={:.2}",
                report.aggregate_score,
                report.risk.severity.as_str(),
                report.risk.probability
            );
            Ok(())
        }
        "query" => {
            // structured queries arrive as JSON on stdin
            let mut raw = String::new();
            use std::io::Read;
            std::io::stdin()
                .read_to_string(&mut raw)
                .map_err(|e| e.to_string())?;
            let query: PatternQuery = serde_json::from_str(&raw).map_err(|e| e.to_string())?;
            let rows = analytics.query(&query).map_err(|e| e.to_string())?;
            for row in rows {
                println!(
                    "{} -{}-> {}",
                    row.source.name,
                    row.relationship.kind.as_str(),
                    row.target.name
                );
            }
            Ok(())
        }
        "recommend" => {
            let list = analytics.recommendations(None).map_err(|e| e.to_string())?;
            for rec in list.iter() {
                println!(
                    "#{} {} {} -{}-> {} confidence={:.0}",
                    rec.id,
                    rec.action.as_str(),
                    rec.source_id,
                    rec.kind.as_str(),
                    rec.target_id,
                    rec.confidence
                );
            }
            Ok(())
        }
        other => Err(format!("unknown command {other}")),
    }
}
