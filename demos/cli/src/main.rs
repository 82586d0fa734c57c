use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Parser;
use queue_core::{QueueConfig, QueueEntry, QueueSnapshot, UrgencyTier};
use queue_json::summarize_appointments_str;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "reception-queue",
    about = "Dựng bảng hàng đợi lễ tân từ file JSON lịch hẹn trong ngày."
)]
struct Args {
    /// Đường dẫn tới file JSON lịch hẹn.
    #[arg(short, long)]
    input: PathBuf,

    /// Thời điểm tính hàng đợi (RFC 3339), mặc định là giờ hệ thống.
    /// Không dùng cùng `--watch` vì mỗi nhịp lấy giờ hệ thống.
    #[arg(long, conflicts_with = "watch")]
    now: Option<DateTime<Utc>>,

    /// File JSON cấu hình ngưỡng, có thể chỉ ghi một phần.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Đọc lại file và tính lại theo chu kỳ làm mới.
    #[arg(short, long)]
    watch: bool,

    /// In snapshot dạng JSON.
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;
    config.validate()?;

    if !args.watch {
        let now = args.now.unwrap_or_else(Utc::now);
        return render_once(&args, &config, now);
    }

    let interval = Duration::from_secs(u64::from(config.refresh_interval_seconds));
    tracing::info!(
        interval_seconds = config.refresh_interval_seconds,
        "watching appointment file"
    );
    loop {
        // Lỗi đọc file giữa chừng chỉ ghi log, bảng được tính lại ở nhịp sau.
        if let Err(err) = render_once(&args, &config, Utc::now()) {
            tracing::warn!("refresh failed: {err:#}");
        }
        thread::sleep(interval);
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<QueueConfig> {
    let Some(path) = path else {
        return Ok(QueueConfig::default());
    };

    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Không đọc được file cấu hình {path:?}"))?;
    serde_json::from_str(&data).with_context(|| format!("Cấu hình không hợp lệ trong {path:?}"))
}

fn render_once(args: &Args, config: &QueueConfig, now: DateTime<Utc>) -> anyhow::Result<()> {
    let data = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Không đọc được file {:?}", args.input))?;

    let snapshot = summarize_appointments_str(&data, config, now)?;
    tracing::debug!(
        listed = snapshot.len(),
        excluded = snapshot.excluded,
        skipped = snapshot.skipped,
        "queue derived"
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print_board(&snapshot);
    }

    Ok(())
}

fn print_board(snapshot: &QueueSnapshot) {
    let counts = snapshot.counts();
    println!(
        "Generated at: {}\nWaiting: {} (urgent {}) | In progress: {} | Upcoming: {} (late {}) | Cancelled: {}",
        snapshot.generated_at,
        counts.waiting,
        counts.urgent,
        counts.in_progress,
        counts.upcoming,
        counts.late,
        counts.cancelled
    );

    print_bucket("Đang chờ", snapshot.waiting(), "Không có bệnh nhân đang chờ");
    print_bucket("Đang khám", snapshot.in_progress(), "Không có ca đang khám");
    print_bucket("Sắp tới (2 giờ)", snapshot.upcoming(), "Không có lịch sắp tới");
    print_bucket("Đã hủy", snapshot.cancelled(), "Không có lịch bị hủy");

    if snapshot.skipped > 0 {
        println!("\nBỏ qua {} bản ghi không hợp lệ", snapshot.skipped);
    }
}

fn print_bucket(title: &str, entries: &[QueueEntry], empty_label: &str) {
    println!("\n{title}");
    if entries.is_empty() {
        println!("  {empty_label}");
        return;
    }

    for entry in entries {
        let start = entry
            .start()
            .map(|dt| dt.format("%H:%M").to_string())
            .unwrap_or_else(|| "--:--".to_string());
        let service = entry.appointment.service_code.as_deref().unwrap_or("-");
        let mut line = format!(
            "  {start}  {:<24} {:<20} {service}",
            entry.appointment.patient_label(),
            entry.appointment.provider_label()
        );

        if let Some(wait) = entry.wait {
            line.push_str(&format!("  {} phút [{}]", wait.elapsed_minutes, tier_label(wait.tier)));
        }
        if entry.late {
            line.push_str("  trễ giờ");
        }

        println!("{line}");
    }
}

fn tier_label(tier: UrgencyTier) -> &'static str {
    match tier {
        UrgencyTier::Routine => "routine",
        UrgencyTier::Priority => "priority",
        UrgencyTier::Urgent => "urgent",
    }
}
