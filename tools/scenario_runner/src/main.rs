use pbq_core::catalog::library::library_v1;
use pbq_core::catalog::model::SlotKind;
use pbq_core::catalog::{EntityCatalog, Strategy};
use pbq_core::determinism::shuffle::ShuffleSeed;
use pbq_core::session::answers::AnswerSheet;
use pbq_core::session::journal::{verify_chain, SessionEventType};
use pbq_core::session::{NoopHost, ScenarioSession, SessionState};
use pbq_core::validator::validate;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{info, Level};

fn main() {
    // Self-audit over the embedded library: the ground truth of every scenario must
    // pass with 100, a deliberately wrong attempt must fail and leave the session open.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()),
        )
        .init();

    let lib = library_v1().expect("embedded library");
    info!(scenarios = lib.scenarios.len(), "library loaded");

    let mut any_fail = false;
    for id in lib.ids() {
        let catalog = lib.catalog(id).expect("catalog builds");

        let right = play_ground_truth(&catalog);
        let wrong = play_wrong_attempt(&catalog);
        let ok = right.is_ok() && wrong.is_ok();
        println!(
            "SCENARIO {} {} solved={} wrong={}",
            id,
            if ok { "PASS" } else { "FAIL" },
            describe(&right),
            describe(&wrong)
        );
        any_fail |= !ok;
    }

    if any_fail {
        std::process::exit(1);
    }
}

fn describe(r: &Result<u8, String>) -> String {
    match r {
        Ok(score) => format!("{}", score),
        Err(e) => format!("ERROR({})", e),
    }
}

fn play_ground_truth(catalog: &std::sync::Arc<EntityCatalog>) -> Result<u8, String> {
    let sheet = AnswerSheet::ground_truth(catalog).map_err(|e| e.to_string())?;
    let mut session = ScenarioSession::new(catalog.clone(), NoopHost, ShuffleSeed::Entropy)
        .map_err(|e| e.to_string())?;
    sheet.apply(&mut session).map_err(|e| e.to_string())?;
    session.advance_to_final().map_err(|e| e.user_message())?;

    let first = validate(session.store(), catalog).map_err(|e| e.to_string())?;
    let again = validate(session.store(), catalog).map_err(|e| e.to_string())?;
    if first != again {
        return Err("validation is not deterministic".to_string());
    }

    let mut pending = session
        .submit_with_delay(Duration::from_millis(1500))
        .map_err(|e| e.user_message())?;
    let verdict = pending.skip().ok_or("verdict missing")?;
    if !verdict.passed || verdict.score != 100 {
        return Err(format!("ground truth scored {}", verdict.score));
    }
    if session.state() != SessionState::Passed {
        return Err("session not closed after pass".to_string());
    }
    verify_chain(session.journal().events()).map_err(|e| e.to_string())?;
    Ok(verdict.score)
}

fn play_wrong_attempt(catalog: &std::sync::Arc<EntityCatalog>) -> Result<u8, String> {
    let sheet = wrong_sheet(catalog);
    let mut session = ScenarioSession::new(catalog.clone(), NoopHost, ShuffleSeed::Fixed(1))
        .map_err(|e| e.to_string())?;
    let verdict = sheet.play(&mut session).map_err(|e| e.user_message())?;
    if verdict.passed || verdict.message.is_empty() {
        return Err(format!("wrong attempt passed with {}", verdict.score));
    }
    if session.state() != SessionState::Active
        || session.journal().count(SessionEventType::ScenarioCompleted) != 0
    {
        return Err("failed attempt closed the session".to_string());
    }
    Ok(verdict.score)
}

/// Every slot answered with something it does not accept; flags on every decoy
/// plus a single real finding.
fn wrong_sheet(catalog: &EntityCatalog) -> AnswerSheet {
    let mut sheet = AnswerSheet::ground_truth(catalog).unwrap_or_default();
    let mut used = BTreeSet::new();
    for slot in catalog.slots() {
        match slot.kind {
            SlotKind::Placement => {
                let decoy = catalog
                    .items()
                    .iter()
                    .find(|i| !slot.accepts(&i.id) && !used.contains(&i.id));
                if let Some(item) = decoy {
                    used.insert(item.id.clone());
                    sheet.placements.insert(slot.id.clone(), item.id.clone());
                }
            }
            SlotKind::Choice => {
                if let Some(opt) = slot.options.iter().find(|o| !slot.accepts(&o.id)) {
                    sheet.selections.insert(slot.id.clone(), opt.id.clone());
                }
            }
        }
    }
    if let Strategy::FlagDetection { positives } = catalog.strategy() {
        let mut flags: Vec<String> = catalog
            .items()
            .iter()
            .filter(|i| !positives.contains(&i.id))
            .map(|i| i.id.clone())
            .collect();
        flags.extend(positives.iter().take(1).cloned());
        sheet.flags = flags;
    }
    sheet
}
