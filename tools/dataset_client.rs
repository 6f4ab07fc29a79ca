//! Synthetic Dataset Client
//!
//! Generates a labeled tabular dataset and uploads it to the training
//! endpoint for pipeline testing.

use rand::Rng;
use tracing::{info, warn};

/// Generator for synthetic customer-churn rows
struct RowGenerator {
    rng: rand::rngs::ThreadRng,
}

impl RowGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    /// A customer likely to stay
    fn generate_retained(&mut self) -> Vec<String> {
        let income = self.rng.gen_range(45_000.0..120_000.0_f64);
        let tenure = self.rng.gen_range(24..120);
        let tickets = self.rng.gen_range(0..3);
        let segment = self.random_choice(&["premium", "standard"]);
        vec![
            format!("{:.0}", income),
            tenure.to_string(),
            tickets.to_string(),
            segment.to_string(),
            "no".to_string(),
        ]
    }

    /// A customer likely to churn
    fn generate_churned(&mut self) -> Vec<String> {
        let income = self.rng.gen_range(12_000.0..40_000.0_f64);
        let tenure = self.rng.gen_range(1..18);
        let tickets = self.rng.gen_range(4..15);
        let segment = self.random_choice(&["standard", "trial"]);
        vec![
            format!("{:.0}", income),
            tenure.to_string(),
            tickets.to_string(),
            segment.to_string(),
            "yes".to_string(),
        ]
    }

    fn random_choice<'a>(&mut self, choices: &[&'a str]) -> &'a str {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

fn build_csv(rows: u64, churn_rate: f64) -> anyhow::Result<Vec<u8>> {
    let mut generator = RowGenerator::new();
    let mut rng = rand::thread_rng();
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(["income", "tenure_months", "support_tickets", "segment", "churned"])?;

    let mut churned = 0;
    for _ in 0..rows {
        let row = if rng.gen_bool(churn_rate) {
            churned += 1;
            generator.generate_churned()
        } else {
            generator.generate_retained()
        };
        writer.write_record(&row)?;
    }

    info!(rows, churned, "Generated synthetic dataset");
    Ok(writer.into_inner()?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dataset_client=info".parse()?),
        )
        .init();

    info!("Starting Synthetic Dataset Client");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let server_url = args
        .get(1)
        .map(|s| s.as_str())
        .unwrap_or("http://localhost:8080");
    let rows: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(200);
    let churn_rate: f64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(0.3);

    info!(
        server_url = %server_url,
        rows,
        churn_rate,
        "Configuration loaded"
    );

    let csv_bytes = build_csv(rows, churn_rate)?;

    let form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(csv_bytes.clone())
            .file_name("synthetic.csv")
            .mime_str("text/csv")?,
    );

    let client = reqwest::Client::new();
    let response = match client
        .post(format!("{}/upload", server_url))
        .multipart(form)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "Failed to reach server. Printing a sample instead.");
            return run_dry_mode(&csv_bytes);
        }
    };

    let status = response.status();
    let body: serde_json::Value = response.json().await?;
    info!(status = %status, "Training run finished");
    println!("{}", serde_json::to_string_pretty(&body)?);

    Ok(())
}

fn run_dry_mode(csv_bytes: &[u8]) -> anyhow::Result<()> {
    let text = String::from_utf8_lossy(csv_bytes);
    let sample: Vec<&str> = text.lines().take(11).collect();
    info!("Dataset sample:\n{}", sample.join("\n"));
    Ok(())
}
