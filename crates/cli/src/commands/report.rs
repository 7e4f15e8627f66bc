//! `cardiolake report` — Run the specialists for one patient, then take questions.
//!
//! Reports live in this process's session only; questions must be asked in the
//! same run, via `--ask` or interactively.

use std::io::Write;

use cardiolake_agents::templates::quick_question;
use cardiolake_agents::{CachedReportSet, QUICK_QUESTIONS, QaProcessor, ReportPipeline, Session};
use cardiolake_fhir::SummaryService;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{CommandResult, agent_invoker, datastore, load_config};
use crate::render;

/// Quick-question labels expand to their prompt; anything else is asked as typed.
fn expand_question(input: &str) -> &str {
    quick_question(input).map_or(input, |q| q.prompt)
}

fn print_reports(reports: &CachedReportSet) {
    for (title, body) in [
        ("CARDIOLOGY", &reports.cardiology),
        ("RADIOLOGY", &reports.radiology),
        ("ENDOCRINOLOGY", &reports.endocrinology),
        ("COMPREHENSIVE ANALYSIS", &reports.comprehensive),
    ] {
        println!("\n{}", "=".repeat(60));
        println!("{title}");
        println!("{}", "=".repeat(60));
        println!("{body}");
    }
    println!();
}

pub async fn run(patient_id: &str, questions: Vec<String>, interactive: bool) -> CommandResult {
    let config = load_config()?;
    let summaries = SummaryService::from_config(datastore(&config)?, &config.healthlake);
    let invoker = agent_invoker(&config)?;
    let pipeline = ReportPipeline::new(invoker.clone());
    let qa = QaProcessor::new(invoker);
    let mut session = Session::new();

    eprint!("  Loading patient...");
    let summary = summaries.summarize(patient_id).await?;
    eprint!("\r                    \r");
    print!("{}", render::summary(&summary));

    eprint!("  Consulting specialists...");
    let reports = pipeline.generate(&mut session, &summary).await?;
    eprint!("\r                          \r");
    print_reports(&reports);

    for question in &questions {
        let question = expand_question(question);
        println!("  You > {question}\n");
        let reply = qa.answer(&mut session, question).await?;
        println!("{}", render::reply(&reply));
    }

    if !interactive {
        return Ok(());
    }

    println!("  Ask about the reports. Quick questions:");
    for q in &QUICK_QUESTIONS {
        println!("    {:<20} {}", q.label, q.prompt);
    }
    println!("  Type 'clear' to drop the reports, 'exit' to quit.\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    print!("  You > ");
    std::io::stdout().flush()?;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => {}
            "exit" | "quit" => break,
            "clear" => {
                session.clear();
                println!("  Reports and history cleared.\n");
            }
            question => match qa.answer(&mut session, expand_question(question)).await {
                Ok(reply) => println!("\n{}", render::reply(&reply)),
                Err(e) => eprintln!("  [Error] {e}\n"),
            },
        }
        print!("  You > ");
        std::io::stdout().flush()?;
    }

    println!("\n  {} question(s) answered. Goodbye! 👋\n", session.history().len());
    Ok(())
}

pub async fn list_questions() -> CommandResult {
    println!("  Quick questions\n");
    for q in &QUICK_QUESTIONS {
        println!("  {:<20} {}", q.label, q.prompt);
    }
    Ok(())
}
