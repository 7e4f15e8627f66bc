//! `cardiolake patients | summary | observations | verify` — Read-only queries.

use cardiolake_fhir::SummaryService;

use super::{CommandResult, datastore, load_config};
use crate::render;

fn service() -> Result<SummaryService, Box<dyn std::error::Error>> {
    let config = load_config()?;
    let store = datastore(&config)?;
    Ok(SummaryService::from_config(store, &config.healthlake))
}

pub async fn list(count: Option<u32>, json: bool) -> CommandResult {
    let patients = service()?.list_patients(count).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&patients)?);
        return Ok(());
    }

    println!("  {} patient(s)\n", patients.len());
    for p in &patients {
        println!("  {:<38} {:<28} {:<8} {}", p.id, p.name, p.gender, p.birth_date);
    }
    Ok(())
}

pub async fn summary(patient_id: &str, json: bool) -> CommandResult {
    let summary = service()?.summarize(patient_id).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", render::summary(&summary));
    }
    Ok(())
}

pub async fn observations(patient_id: &str, json: bool) -> CommandResult {
    let rows = service()?.measurements(patient_id).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("  No numeric observations for {patient_id}");
    }
    for m in &rows {
        println!("  {:<26} {:<32} {:>8} {}", m.date, m.measurement, m.value, m.unit);
    }
    Ok(())
}

pub async fn verify(patient_id: &str) -> CommandResult {
    let check = service()?.verify(patient_id).await?;

    println!("Verifying patient {patient_id}...\n");
    match &check.name {
        Some(name) => println!("[OK] Patient: {name}"),
        None => println!("[ERROR] Patient not found"),
    }

    print_section("Conditions", &check.conditions);
    if check.ecg_observations > 0 {
        println!("[OK] ECG waveform: {} observation(s)", check.ecg_observations);
    } else {
        println!("[WARN] No ECG waveform");
    }
    print_section("DiagnosticReports", &check.reports);
    print_section("Media", &check.media);

    if !check.found() {
        return Err(format!("patient {patient_id} not found").into());
    }
    Ok(())
}

fn print_section(label: &str, items: &[String]) {
    if items.is_empty() {
        println!("[WARN] No {}", label.to_lowercase());
    } else {
        println!("[OK] {label}: {}", items.len());
        for item in items {
            println!("     - {item}");
        }
    }
}
