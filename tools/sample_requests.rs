//! Sample Request Generator
//!
//! Prints random `/predict` request bodies, one JSON object per line, for
//! manual and load testing:
//!
//! ```text
//! sample_requests --count 50 | while read -r body; do
//!     curl -s -X POST localhost:8000/predict -H 'content-type: application/json' -d "$body"
//! done
//! ```

use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::{BufWriter, Write};
use term_deposit_api::types::record::{
    Contact, Education, InputRecord, Job, Marital, Month, Poutcome, YesNo,
};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "sample_requests", about = "Generate random /predict request bodies")]
struct Args {
    /// Number of bodies to print
    #[arg(long, default_value_t = 100)]
    count: u64,

    /// Fraction of bodies drawn from the likely-subscriber profile
    #[arg(long, default_value_t = 0.15)]
    likely_rate: f64,

    /// Fraction of bodies made deliberately invalid (expect HTTP 422)
    #[arg(long, default_value_t = 0.0)]
    invalid_rate: f64,

    /// RNG seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,
}

/// Random customer record generator
struct RecordGenerator {
    rng: StdRng,
}

impl RecordGenerator {
    fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    /// Typical contacted customer: short call, no previous campaign
    fn generate_typical(&mut self) -> InputRecord {
        InputRecord {
            age: self.rng.gen_range(22..60),
            balance: (self.rng.gen_range(-500.0..4000.0_f64) * 100.0).round() / 100.0,
            duration: self.rng.gen_range(5..400),
            campaign: self.rng.gen_range(1..8),
            previous: 0,
            job: self.pick(&[
                Job::BlueCollar,
                Job::Management,
                Job::Technician,
                Job::Admin,
                Job::Services,
                Job::Entrepreneur,
                Job::Housemaid,
            ]),
            marital: self.pick(&[Marital::Married, Marital::Married, Marital::Single, Marital::Divorced]),
            education: self.pick(&[Education::Secondary, Education::Tertiary, Education::Primary]),
            default: if self.rng.gen_bool(0.02) { YesNo::Yes } else { YesNo::No },
            housing: self.pick(&[YesNo::Yes, YesNo::No]),
            loan: if self.rng.gen_bool(0.15) { YesNo::Yes } else { YesNo::No },
            contact: self.pick(&[Contact::Cellular, Contact::Unknown, Contact::Telephone]),
            month: self.pick(&[Month::May, Month::Jun, Month::Jul, Month::Aug, Month::Nov]),
            poutcome: Poutcome::Unknown,
        }
    }

    /// Long call, earlier successful contact, no loans
    fn generate_likely(&mut self) -> InputRecord {
        InputRecord {
            age: self.rng.gen_range(25..90),
            balance: (self.rng.gen_range(1000.0..20000.0_f64) * 100.0).round() / 100.0,
            duration: self.rng.gen_range(400..1500),
            campaign: self.rng.gen_range(1..3),
            previous: self.rng.gen_range(1..6),
            job: self.pick(&[Job::Retired, Job::Student, Job::Management, Job::Unemployed]),
            marital: self.pick(&[Marital::Single, Marital::Married]),
            education: self.pick(&[Education::Tertiary, Education::Secondary]),
            default: YesNo::No,
            housing: YesNo::No,
            loan: YesNo::No,
            contact: Contact::Cellular,
            month: self.pick(&[Month::Mar, Month::Sep, Month::Oct, Month::Dec]),
            poutcome: Poutcome::Success,
        }
    }

    /// Break one constraint of an otherwise valid body
    fn invalidate(&mut self, body: &mut serde_json::Value) {
        match self.rng.gen_range(0..4) {
            0 => body["age"] = serde_json::json!(self.rng.gen_range(0..18)),
            1 => body["campaign"] = serde_json::json!(0),
            2 => body["month"] = serde_json::json!("May"),
            _ => {
                if let Some(object) = body.as_object_mut() {
                    object.remove("job");
                }
            }
        }
    }

    fn pick<T: Copy>(&mut self, choices: &[T]) -> T {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sample_requests=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let likely_rate = args.likely_rate.clamp(0.0, 1.0);
    let invalid_rate = args.invalid_rate.clamp(0.0, 1.0);
    info!(
        count = args.count,
        likely_rate = likely_rate,
        invalid_rate = invalid_rate,
        seed = ?args.seed,
        "Generating sample requests"
    );

    let mut generator = RecordGenerator::new(args.seed);
    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    let mut likely_count = 0;
    let mut invalid_count = 0;

    for _ in 0..args.count {
        let record = if generator.rng.gen_bool(likely_rate) {
            likely_count += 1;
            generator.generate_likely()
        } else {
            generator.generate_typical()
        };

        let mut body = serde_json::to_value(&record)?;
        if generator.rng.gen_bool(invalid_rate) {
            invalid_count += 1;
            generator.invalidate(&mut body);
        }

        serde_json::to_writer(&mut out, &body)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;

    info!(
        "Generated {} bodies ({} likely subscribers, {} invalid)",
        args.count, likely_count, invalid_count
    );
    Ok(())
}
