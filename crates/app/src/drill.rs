//! Interactive drill over stdin.

use std::io::Write;

use services::{AppServices, ReviewService, SessionError};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use vocab_core::model::{
    Confidence, FlashcardRating, Quality, ReviewItem, StudyMode, response_to_quality,
};

type Input = Lines<BufReader<Stdin>>;

/// What the learner chose for the current item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Answer(Quality),
    Skip,
    Quit,
}

async fn prompt(input: &mut Input, text: &str) -> std::io::Result<Option<String>> {
    print!("{text}");
    std::io::stdout().flush()?;
    input.next_line().await
}

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// A typed answer matches the definition or any of its `,`/`;` separated
/// alternatives, ignoring case and extra whitespace.
fn answers_match(answer: &str, definition: &str) -> bool {
    let answer = normalize(answer);
    if answer.is_empty() {
        return false;
    }
    answer == normalize(definition)
        || definition
            .split([',', ';'])
            .any(|alternative| normalize(alternative) == answer)
}

async fn ask_flashcard(
    input: &mut Input,
    item: &ReviewItem,
    review: &ReviewService,
) -> std::io::Result<Step> {
    let Some(line) = prompt(input, "  press Enter to reveal (s skip, q quit) ").await? else {
        return Ok(Step::Quit);
    };
    match line.trim() {
        "q" => return Ok(Step::Quit),
        "s" => return Ok(Step::Skip),
        _ => {}
    }

    println!("  {}", item.definition());
    let preview = review.scheduler().preview(item, review.now());
    let choices = format!(
        "  [w]rong {}d  [h]ard {}d  [g]ood {}d  [e]asy {}d  [s]kip  [q]uit: ",
        preview.wrong, preview.hard, preview.good, preview.easy
    );
    loop {
        let Some(line) = prompt(input, &choices).await? else {
            return Ok(Step::Quit);
        };
        match line.trim() {
            "q" | "quit" => return Ok(Step::Quit),
            "s" | "skip" => return Ok(Step::Skip),
            raw => match raw.parse::<FlashcardRating>() {
                Ok(rating) => return Ok(Step::Answer(rating.quality())),
                Err(err) => println!("  {err}"),
            },
        }
    }
}

async fn ask_quiz(input: &mut Input, item: &ReviewItem) -> std::io::Result<Step> {
    let Some(answer) = prompt(input, "  your answer (:s skip, :q quit): ").await? else {
        return Ok(Step::Quit);
    };
    match answer.trim() {
        ":q" => return Ok(Step::Quit),
        ":s" => return Ok(Step::Skip),
        _ => {}
    }

    let is_correct = answers_match(&answer, item.definition());
    if is_correct {
        println!("  correct");
    } else {
        println!("  expected: {}", item.definition());
    }

    let confidence = loop {
        let Some(line) = prompt(input, "  how sure were you? [h]igh/[l]ow: ").await? else {
            return Ok(Step::Quit);
        };
        match line.trim().to_ascii_lowercase().as_str() {
            "h" | "high" => break Confidence::High,
            "l" | "low" | "" => break Confidence::Low,
            other => println!("  unknown confidence: {other}"),
        }
    };
    Ok(Step::Answer(response_to_quality(is_correct, confidence)))
}

/// Run a drill until every item is answered or skipped, or the learner quits.
///
/// # Errors
///
/// Returns storage, review or stdin errors.
pub async fn run(
    services: &AppServices,
    mode: StudyMode,
    limit: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let session_loop = services.session_loop();
    let review = services.review();

    let mut session = match session_loop.start_session(mode, limit).await {
        Ok(session) => session,
        Err(SessionError::Empty) => {
            println!("Nothing is due. Come back later.");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    while let Some(item) = session.current_item().cloned() {
        let progress = session.progress();
        println!();
        println!(
            "[{}/{}] {}",
            progress.total - progress.remaining + 1,
            progress.total,
            item.term()
        );

        let step = match session.mode() {
            StudyMode::Quiz => ask_quiz(&mut input, &item).await?,
            _ => ask_flashcard(&mut input, &item, &review).await?,
        };
        match step {
            Step::Answer(quality) => {
                let result = session_loop.answer_current(&mut session, quality).await?;
                let after = &result.reviewed.after;
                println!(
                    "  next review in {} day(s) on {}",
                    after.interval_days(),
                    after.next_review().format("%Y-%m-%d")
                );
            }
            Step::Skip => session.skip_current(review.now())?,
            Step::Quit => break,
        }
    }

    let log_id = session_loop.end_session(&mut session).await?;
    let progress = session.progress();
    let correct = session
        .qualities()
        .iter()
        .filter(|q| q.is_correct())
        .count();
    println!();
    println!(
        "Answered {} of {} ({} correct, {} skipped).",
        progress.answered, progress.total, correct, progress.skipped
    );
    if log_id.is_some() {
        println!("Session saved.");
    }
    Ok(())
}
