use clap::Args;
use std::path::PathBuf;
use tmcq::assessments::{load_history_from_path, HistoryEntry};
use tmcq::error::AppError;
use tmcq::scoring::{
    compute_audit_global_score, compute_composite, compute_trend, evaluate_alert, validate_score,
    AiAuditOutput, CompositeScore,
};

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// QCM success rate (0-100)
    #[arg(long)]
    pub(crate) qcm: f64,
    /// Clinical case average (0-100)
    #[arg(long)]
    pub(crate) cases: f64,
    /// Consultation audit score (0-100)
    #[arg(long)]
    pub(crate) audit: f64,
}

#[derive(Args, Debug)]
pub(crate) struct AuditArgs {
    /// Audit document in JSON
    pub(crate) path: PathBuf,
}

#[derive(Args, Debug)]
pub(crate) struct TrendArgs {
    /// CSV export with evaluation_date,qcm_score,clinical_cases_score,ai_audit_score
    pub(crate) path: PathBuf,
    /// Also list every evaluation, oldest first
    #[arg(long)]
    pub(crate) list: bool,
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let qcm = validate_score("qcm_score", args.qcm)?;
    let cases = validate_score("clinical_cases_score", args.cases)?;
    let audit = validate_score("ai_audit_score", args.audit)?;

    let score = compute_composite(qcm, cases, audit);
    print!("{}", render_score(&score));
    Ok(())
}

pub(crate) fn run_audit(args: AuditArgs) -> Result<(), AppError> {
    let file = std::fs::File::open(&args.path)?;
    let document: AiAuditOutput = serde_json::from_reader(file)?;
    document.validate()?;

    print!("{}", render_audit(&document));
    Ok(())
}

pub(crate) fn run_trend(args: TrendArgs) -> Result<(), AppError> {
    let entries = load_history_from_path(&args.path)?;
    print!("{}", render_trend(&entries, args.list));
    Ok(())
}

fn render_score(score: &CompositeScore) -> String {
    let mut out = format!("T-MCQ {}/100 -> {}\n", score.total, score.status.label());
    out.push_str(&format!(
        "- clinical {} | safety {} | prescription {} | documentation {} | communication {}\n",
        score.clinical, score.safety, score.prescription, score.documentation, score.communication
    ));
    out
}

fn render_audit(document: &AiAuditOutput) -> String {
    let global = compute_audit_global_score(document);
    let mut out = format!("Audit global score {global}/100\n");
    if let Some(estimate) = document.global_tmcq_score {
        out.push_str(&format!(
            "- reviewer estimate {estimate:.0} (not used for decisions)\n"
        ));
    }

    match evaluate_alert(document) {
        Some(notice) => {
            out.push_str(&format!(
                "Alert: {} [{}]\n  {}\n",
                notice.alert_type.label(),
                notice.severity.label(),
                notice.message
            ));
        }
        None => out.push_str("No alert raised\n"),
    }

    if !document.recommendations.is_empty() {
        out.push_str("Recommendations:\n");
        for item in &document.recommendations {
            out.push_str(&format!("  - {item}\n"));
        }
    }
    out
}

fn render_trend(entries: &[HistoryEntry], list: bool) -> String {
    let scores: Vec<CompositeScore> = entries.iter().map(|entry| entry.tmcq).collect();
    let stats = compute_trend(&scores);

    let mut out = format!(
        "{} evaluations | average {}/100 | trend {}\n",
        stats.count,
        stats.average_total,
        stats.trend.label()
    );
    if let Some(latest) = stats.most_recent {
        out.push_str(&format!(
            "- most recent {}/100 ({})\n",
            latest.total,
            latest.status.label()
        ));
    }

    if list {
        for entry in entries {
            out.push_str(&format!(
                "  {} {:>3} {}\n",
                entry.evaluated_at.format("%Y-%m-%d"),
                entry.tmcq.total,
                entry.tmcq.status.label()
            ));
        }
    }
    out
}
