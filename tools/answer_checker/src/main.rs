use pbq_core::catalog::library::library_v1;
use pbq_core::determinism::shuffle::ShuffleSeed;
use pbq_core::error::CoreError;
use pbq_core::session::answers::AnswerSheet;
use pbq_core::session::{NoopHost, ScenarioSession};
use tracing::Level;

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::WARN.into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("usage: answer_checker <scenario_id> <path/to/answers.json>");
        std::process::exit(2);
    }

    let lib = match library_v1() {
        Ok(lib) => lib,
        Err(e) => {
            eprintln!("library error: {}", e);
            std::process::exit(1);
        }
    };
    let catalog = match lib.catalog(&args[1]) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("known scenarios: {}", lib.ids().join(", "));
            std::process::exit(2);
        }
    };
    let sheet = match std::fs::read_to_string(&args[2])
        .map_err(CoreError::from)
        .and_then(|text| AnswerSheet::from_json(&text))
    {
        Ok(s) => s,
        Err(e) => {
            eprintln!("cannot read answers: {}", e);
            std::process::exit(2);
        }
    };

    let mut session = match ScenarioSession::new(catalog, NoopHost, ShuffleSeed::Identity) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("session error: {}", e);
            std::process::exit(1);
        }
    };
    match sheet.play(&mut session) {
        Ok(verdict) => {
            println!("{}", serde_json::to_string_pretty(&verdict).unwrap());
            if verdict.passed {
                std::process::exit(0);
            } else {
                std::process::exit(1);
            }
        }
        Err(e) if e.is_recoverable() => {
            eprintln!("rejected: {}", e.user_message());
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("answer error: {}", e);
            std::process::exit(1);
        }
    }
}
