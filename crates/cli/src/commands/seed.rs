//! `cardiolake seed` — Load the synthetic datasets into the datastore.

use std::path::Path;

use cardiolake_fhir::builders::MediaInput;
use cardiolake_fhir::seed::{
    MediaCase, cardiac_patients, mri_patients, reference_ecg_patient,
};
use cardiolake_fhir::{SeedReport, Seeder};

use super::{CommandResult, datastore, load_config};

pub enum Dataset<'a> {
    Cardiac,
    Ecg,
    Mri,
    Media {
        patient_id: &'a str,
        patient_name: Option<&'a str>,
        image: &'a Path,
        content_type: &'a str,
        title: Option<&'a str>,
    },
}

pub async fn run(dataset: Dataset<'_>) -> CommandResult {
    let config = load_config()?;
    let seeder = Seeder::new(datastore(&config)?);

    let report = match dataset {
        Dataset::Cardiac => {
            println!("🫀 Seeding {} cardiac patients...\n", cardiac_patients().len());
            seeder.seed_cardiac(&cardiac_patients()).await
        }
        Dataset::Ecg => {
            println!("📈 Seeding the reference ECG patient...\n");
            seeder.seed_cardiac(&[reference_ecg_patient()]).await
        }
        Dataset::Mri => {
            println!("🧠 Seeding {} MRI patients...\n", mri_patients().len());
            seeder.seed_mri(&mri_patients()).await
        }
        Dataset::Media {
            patient_id,
            patient_name,
            image,
            content_type,
            title,
        } => {
            let data = std::fs::read(image)
                .map_err(|e| format!("Failed to read {}: {e}", image.display()))?;
            let title = title.map(str::to_string).unwrap_or_else(|| {
                image
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "Image".into())
            });
            println!("🖼️  Attaching {} ({} bytes) to {patient_id}...\n", title, data.len());
            let case = MediaCase {
                patient_id: patient_id.to_string(),
                patient_name: patient_name.map(str::to_string),
                media: MediaInput {
                    content_type: content_type.to_string(),
                    data,
                    title,
                },
            };
            seeder.seed_media(&[case]).await
        }
    };

    print_report(&report);
    if report.is_complete() {
        Ok(())
    } else {
        Err(format!("{} patient(s) failed to seed", report.failures.len()).into())
    }
}

fn print_report(report: &SeedReport) {
    for patient in &report.created {
        println!("  ✅ {} ({}): {}", patient.name, patient.patient_id, patient.label);
        for resource in &patient.resources {
            println!("       {resource}");
        }
    }
    for failure in &report.failures {
        println!("  ❌ {}: {}", failure.name, failure.error);
    }
    println!(
        "\n  {} created, {} failed",
        report.created.len(),
        report.failures.len()
    );
}
