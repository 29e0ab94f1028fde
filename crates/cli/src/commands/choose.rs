//! `reactkit choose` — Ask a numbered question and wait for the reply.

use reactkit_core::filter::MessageFilter;
use reactkit_session::FollowUpCollector;

use super::terminal::Terminal;

pub async fn run(options: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    let terminal = Terminal::open()?;
    let replies = FollowUpCollector::new(
        terminal.gateway.clone(),
        terminal.notes.clone(),
        terminal.config.replies.clone(),
    );

    terminal
        .notes
        .search(&terminal.channel, &menu(&options))
        .await;

    let input = terminal.gateway.start_input();
    let filter = MessageFilter::Author(terminal.user().id.clone());
    let outcome = replies.await_reply(&terminal.channel, &filter).await;
    input.abort();

    let reply = outcome?;
    match parse_choice(&reply.content, options.len()) {
        Some(index) => {
            terminal
                .notes
                .music(&terminal.channel, &format!("Selected: {}", options[index]))
                .await;
            Ok(())
        }
        None => {
            let reason = format!(
                "'{}' is not a number between 1 and {}",
                reply.content,
                options.len()
            );
            terminal.notes.fail(&terminal.channel, &reason).await;
            Err(reason.into())
        }
    }
}

/// One line per option, numbered from 1.
fn menu(options: &[String]) -> String {
    let mut lines = vec![format!("Pick a result 1-{}", options.len())];
    lines.extend(
        options
            .iter()
            .enumerate()
            .map(|(i, option)| format!("{}. {option}", i + 1)),
    );
    lines.join("\n")
}

/// Zero-based index named by a 1-based reply.
fn parse_choice(reply: &str, count: usize) -> Option<usize> {
    let n: usize = reply.trim().trim_end_matches('.').parse().ok()?;
    (1..=count).contains(&n).then(|| n - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn menu_numbers_options() {
        let options = vec!["Intro".to_string(), "Outro".to_string()];
        assert_eq!(menu(&options), "Pick a result 1-2\n1. Intro\n2. Outro");
    }

    #[test]
    fn choice_must_be_in_range() {
        assert_eq!(parse_choice("1", 3), Some(0));
        assert_eq!(parse_choice(" 3. ", 3), Some(2));
        assert_eq!(parse_choice("0", 3), None);
        assert_eq!(parse_choice("4", 3), None);
        assert_eq!(parse_choice("two", 3), None);
    }
}
