use anyhow::{Context, Result};
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use super::{parse_date_arg, OutputFormat, Target};
use crate::models::{CreatedAppointment, CustomerDetails};

/// Arguments for `bookd book`
#[derive(Debug, Clone)]
pub struct BookArgs {
    pub date: String,
    pub time: String,
    pub customer: CustomerDetails,
    /// `(question, value)` pairs; a question is named by id or display name
    pub answers: Vec<(String, String)>,
    /// Retry failed submissions without asking
    pub assume_yes: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub service: String,
    pub date: String,
    pub time: String,
    pub attempts: u32,
    pub appointment: CreatedAppointment,
}

impl std::fmt::Display for BookingResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Booked {} on {} at {}", self.service, self.date, self.time)?;
        if let Some(id) = &self.appointment.id {
            writeln!(f, "Confirmation: {}", id)?;
        }
        write!(
            f,
            "Starts {} {}",
            self.appointment.start_date_time.date_time, self.appointment.start_date_time.time_zone
        )
    }
}

/// Book a slot, asking before each resubmission of a failed booking
pub async fn run_book(target: &Target, args: &BookArgs, format: OutputFormat) -> Result<()> {
    let date = parse_date_arg(&args.date)?;
    let (client, mut session) = target.load_date(date).await?;
    session
        .load_questions(&client)
        .await
        .context("Failed to load custom questions")?;
    let mut customer = args.customer.clone();
    customer.answers = args
        .answers
        .iter()
        .map(|(question, value)| session.answer(question, value))
        .collect::<Result<_, _>>()?;

    let slot = session.select_slot(&args.time)?.clone();
    session.open_form()?;

    let mut stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let mut outcome = session.submit(&client, &customer).await.map(|c| c.clone());
    while let Err(err) = &outcome {
        if !session.can_retry_submit() {
            break;
        }
        eprintln!("Booking failed: {}", err);
        if !args.assume_yes && !confirm(&mut stdin, &mut stdout, "Try again? [y/N] ").await? {
            break;
        }
        outcome = session
            .retry_submit(&client, &customer)
            .await
            .map(|c| c.clone());
    }
    let appointment = outcome.context("Booking failed")?;

    let response = BookingResponse {
        service: session
            .selected_service()
            .map(|s| s.display_name.clone())
            .unwrap_or_default(),
        date: date.format("%Y-%m-%d").to_string(),
        time: slot.time,
        attempts: session.submit_attempts(),
        appointment,
    };
    format.print(&response)
}

async fn confirm<R, W>(input: &mut R, output: &mut W, prompt: &str) -> Result<bool>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    output.write_all(prompt.as_bytes()).await?;
    output.flush().await?;

    let mut line = String::new();
    input.read_line(&mut line).await?;
    Ok(is_yes(&line))
}

/// Parse a `QUESTION=VALUE` argument
pub fn parse_answer_arg(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((question, value)) if !question.trim().is_empty() => {
            Ok((question.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("Expected QUESTION=VALUE, got {:?}", s)),
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
