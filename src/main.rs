use std::env;
use std::io::{self, BufRead, Write};

use rentbot_catalog::{HouseCatalog, InMemoryCatalog};
use rentbot_contracts::StateView;
use rentbot_kernel::{policy, ChangeDetection, DialogueState};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    let mut args = env::args().skip(1);
    let cmd = args.next().unwrap_or_default();
    if cmd != "chat" {
        eprintln!("Usage: rentbot chat --config <path>");
        std::process::exit(2);
    }

    let mut config_path = String::from("./config/example-config.yaml");
    while let Some(arg) = args.next() {
        if arg == "--config" {
            if let Some(v) = args.next() {
                config_path = v;
            }
        }
    }

    let cfg = match rentbot_config::load_and_validate(&config_path) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("failed to load config: {e}");
            std::process::exit(1);
        }
    };
    init_logging(&cfg.logging.level);

    let catalog = match InMemoryCatalog::from_csv_path(&cfg.catalog.csv_path) {
        Ok(v) => v.with_locality_matching(cfg.catalog.match_locality),
        Err(e) => {
            eprintln!("failed to load catalog: {e}");
            std::process::exit(1);
        }
    };
    let change_detection =
        ChangeDetection::from_name(&cfg.tracker.change_detection).unwrap_or_default();
    let mut state = DialogueState::new(catalog).with_change_detection(change_detection);
    info!(
        config = %config_path,
        change_detection = ?change_detection,
        auto_policy = cfg.dialogue.auto_policy,
        "chat session started"
    );

    let stdin = io::stdin();
    let stdout = io::stdout();
    if let Err(e) = run(
        &mut state,
        cfg.dialogue.auto_policy,
        stdin.lock(),
        stdout.lock(),
    ) {
        eprintln!("chat exited with error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[derive(Debug, PartialEq)]
enum Command {
    Turn(serde_json::Value),
    Nba(String),
    Reset,
    Resume,
    State,
    Quit,
}

fn parse_command(line: &str) -> Command {
    match line.split_once(' ').unwrap_or((line, "")) {
        (":nba", label) => Command::Nba(label.trim().to_string()),
        (":reset", _) => Command::Reset,
        (":resume", _) => Command::Resume,
        (":state", _) => Command::State,
        (":quit", _) => Command::Quit,
        _ => Command::Turn(
            serde_json::from_str(line)
                .unwrap_or_else(|_| serde_json::Value::String(line.to_string())),
        ),
    }
}

#[derive(Debug, Serialize)]
struct TurnReport {
    state: StateView,
    action: Option<String>,
}

fn run<C, R, W>(
    state: &mut DialogueState<C>,
    auto_policy: bool,
    input: R,
    mut output: W,
) -> Result<(), String>
where
    C: HouseCatalog,
    R: BufRead,
    W: Write,
{
    for line in input.lines() {
        let line = line.map_err(|e| format!("read input failed: {e}"))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let action = match parse_command(line) {
            Command::Turn(value) => {
                state.update_json(&value).map_err(|e| e.to_string())?;
                if auto_policy {
                    let action = policy::next_best_action(&state.get_state());
                    state.update_nba(action.clone());
                    Some(action)
                } else {
                    None
                }
            }
            Command::Nba(label) => {
                state.update_nba(label.clone());
                Some(label)
            }
            Command::Reset => {
                state.reset();
                None
            }
            Command::Resume => {
                state.resume();
                None
            }
            Command::State => state.ledger().last().map(str::to_string),
            Command::Quit => break,
        };

        let report = TurnReport {
            state: state.get_state(),
            action,
        };
        let text = serde_json::to_string(&report)
            .map_err(|e| format!("encode output failed: {e}"))?;
        writeln!(output, "{text}").map_err(|e| format!("write output failed: {e}"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn catalog() -> InMemoryCatalog {
        let text = concat!(
            "Posted On,BHK,Rent,Size,Floor,Area Type,Area Locality,City,Furnishing Status,Tenant Preferred,Bathroom,Point of Contact\n",
            "2022-06-18,2,9000,800,1 out of 2,Carpet Area,Nalasopara East,Mumbai,Unfurnished,Bachelors,1,Contact Owner\n",
            "2022-07-01,2,9500,900,3 out of 4,Carpet Area,Virar West,Mumbai,Furnished,Bachelors/Family,2,Contact Owner\n",
        );
        InMemoryCatalog::from_csv_reader(text.as_bytes()).unwrap()
    }

    fn transcript(auto_policy: bool, lines: &[&str]) -> Vec<Value> {
        let mut state = DialogueState::new(catalog());
        let mut out = Vec::new();
        run(&mut state, auto_policy, lines.join("\n").as_bytes(), &mut out).unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    const SEARCH: &str = r#"[{"intent": "HOUSE_SEARCH", "slots": {"house_size": "800", "house_bhk": "2", "house_rent": "10000", "house_location": "mumbai", "house_city": "mumbai", "house_furnished": "furnished"}}]"#;

    #[test]
    fn parses_host_commands() {
        assert_eq!(
            parse_command(":nba confirmation(\"HOUSE_SEARCH\")"),
            Command::Nba("confirmation(\"HOUSE_SEARCH\")".to_string())
        );
        assert_eq!(parse_command(":reset"), Command::Reset);
        assert_eq!(parse_command(":quit"), Command::Quit);
        assert_eq!(
            parse_command("hello there"),
            Command::Turn(json!("hello there"))
        );
    }

    #[test]
    fn auto_policy_drives_search_to_results() {
        let select = r#"[{"intent": "HOUSE_SELECTION", "slots": {"house_selected": "2"}}]"#;
        let reports = transcript(true, &[SEARCH, SEARCH, select]);
        assert_eq!(reports[0]["state"]["intent"], "HOUSE_SEARCH");
        assert_eq!(reports[0]["action"], "confirmation(\"HOUSE_SEARCH\")");
        assert_eq!(reports[1]["state"]["intent"], "SHOW_HOUSES");
        assert_eq!(reports[1]["action"], "show_houses(HOUSE_SEARCH)");
        assert_eq!(reports[2]["state"]["intent"], "ASK_INFO");
        assert_eq!(reports[2]["action"], "request_slot(\"properties\")");
    }

    #[test]
    fn manual_labels_gate_the_search() {
        let reports = transcript(
            false,
            &[SEARCH, SEARCH, ":nba confirmation(\"HOUSE_SEARCH\")", SEARCH],
        );
        assert_eq!(reports[1]["state"]["intent"], "HOUSE_SEARCH");
        assert_eq!(reports[1]["action"], Value::Null);
        assert_eq!(reports[2]["action"], "confirmation(\"HOUSE_SEARCH\")");
        assert_eq!(reports[3]["state"]["intent"], "SHOW_HOUSES");
    }

    #[test]
    fn garbage_input_falls_back_and_resume_restores() {
        let reports = transcript(
            false,
            &[SEARCH, "what's the weather", ":resume", ":quit", SEARCH],
        );
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[1]["state"]["intent"], "FALLBACK_POLICY");
        assert_eq!(
            reports[1]["state"]["slots"]["reason"],
            "processing error, retry."
        );
        assert_eq!(reports[2]["state"]["intent"], "HOUSE_SEARCH");
    }
}
