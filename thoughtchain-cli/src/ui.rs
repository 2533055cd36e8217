//! Terminal rendering and line input

use async_trait::async_trait;
use console::style;
use std::io::{Stdout, Write};
use thoughtchain_core::{DisplayEvent, DisplaySink, Feedback, FeedbackSource};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

/// Renders display events as styled terminal text
pub struct ConsoleDisplay<W: Write = Stdout> {
    out: W,
    /// Text was written since the last newline
    mid_line: bool,
}

impl ConsoleDisplay<Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> ConsoleDisplay<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            mid_line: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: impl std::fmt::Display) {
        self.end_line();
        // write errors are ignored
        let _ = writeln!(self.out, "{}", text);
    }

    fn end_line(&mut self) {
        if self.mid_line {
            let _ = writeln!(self.out);
            self.mid_line = false;
        }
    }

    fn render(&mut self, event: DisplayEvent) {
        match event {
            DisplayEvent::TaskClassified(classification) => {
                self.line(format!(
                    "{} {}",
                    style("Task Type:").yellow().bold(),
                    classification.task_type
                ));
                self.line(format!(
                    "{} {}",
                    style("Evaluation Criteria:").cyan().bold(),
                    classification.evaluation_criteria.join(", ")
                ));
            }
            DisplayEvent::IterationStarted {
                iteration,
                max_iterations,
            } => {
                self.line("");
                self.line(
                    style(format!(
                        "Thought Process (Iteration {}/{})",
                        iteration, max_iterations
                    ))
                    .yellow()
                    .bold(),
                );
            }
            DisplayEvent::Fragment(fragment) => {
                if fragment.text.is_empty() {
                    return;
                }
                let _ = if fragment.emphasis {
                    write!(self.out, "{}", style(&fragment.text).bold())
                } else {
                    write!(self.out, "{}", fragment.text)
                };
                let _ = self.out.flush();
                self.mid_line = !fragment.text.ends_with('\n');
            }
            DisplayEvent::IterationFinished {
                confidence,
                mind_map,
                ..
            } => {
                self.line("");
                self.line(format!(
                    "{} {:.2}",
                    style("Confidence Score:").yellow().bold(),
                    confidence
                ));
                if !mind_map.is_empty() {
                    self.line(style("Mind Map:").yellow().bold());
                    self.line(style(mind_map).dim());
                }
            }
            DisplayEvent::DeadEnd { iteration } => {
                let notice = format!(
                    "Dead end in iteration {}, trying another approach",
                    iteration
                );
                self.line(style(notice).red());
            }
            DisplayEvent::SolutionFound { iteration } => {
                let notice = format!("Solution found in iteration {}", iteration);
                self.line(style(notice).green().bold());
            }
            DisplayEvent::FeedbackApplied(text) => {
                self.line(style(format!("Feedback noted: {}", text)).dim());
            }
            DisplayEvent::FinalAnswerStarted => {
                self.line("");
                self.line(style("Final Answer").yellow().bold());
            }
            DisplayEvent::FinalAnswerFinished => {
                self.end_line();
            }
        }
    }
}

impl<W: Write + Send> DisplaySink for ConsoleDisplay<W> {
    fn emit(&mut self, event: DisplayEvent) {
        self.render(event);
    }
}

/// Line-oriented stdin shared by the chat prompt and the feedback prompt
pub struct ConsoleInput {
    lines: Lines<BufReader<Stdin>>,
}

impl ConsoleInput {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// Print `prompt` and read one line; `None` at end of input
    pub async fn read_line(
        &mut self,
        prompt: impl std::fmt::Display,
    ) -> std::io::Result<Option<String>> {
        print!("{}", prompt);
        std::io::stdout().flush()?;
        self.lines.next_line().await
    }
}

impl Default for ConsoleInput {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeedbackSource for ConsoleInput {
    async fn feedback(&mut self, _iteration: u32) -> Feedback {
        let prompt = style("Your feedback (Enter to continue, 'finalize' for the final answer): ")
            .cyan()
            .bold();
        match self.read_line(prompt).await {
            Ok(Some(line)) => Feedback::parse(&line),
            // Closed or unreadable input cannot steer anything
            Ok(None) | Err(_) => Feedback::Finalize,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thoughtchain_core::{Classification, MindMap, StyledFragment, TaskType};

    fn render(events: Vec<DisplayEvent>) -> String {
        console::set_colors_enabled(false);
        let mut display = ConsoleDisplay::new(Vec::new());
        for event in events {
            display.emit(event);
        }
        String::from_utf8(display.into_inner()).unwrap()
    }

    #[test]
    fn test_renders_iteration() {
        let out = render(vec![
            DisplayEvent::TaskClassified(Classification::for_task(TaskType::Coding)),
            DisplayEvent::IterationStarted {
                iteration: 1,
                max_iterations: 5,
            },
            DisplayEvent::Fragment(StyledFragment::plain("He said ")),
            DisplayEvent::Fragment(StyledFragment::emphasized("bold")),
            DisplayEvent::IterationFinished {
                iteration: 1,
                confidence: 0.4,
                mind_map: MindMap::build("Root\n  Child"),
            },
        ]);

        assert!(out.contains("Task Type: coding"));
        assert!(out.contains(
            "Evaluation Criteria: correctness, efficiency, readability, maintainability"
        ));
        assert!(out.contains("Thought Process (Iteration 1/5)"));
        assert!(out.contains("He said bold\n"));
        assert!(out.contains("Confidence Score: 0.40"));
        assert!(out.contains("• Root\n  └─ Child"));
    }

    #[test]
    fn test_final_answer_ends_line() {
        let out = render(vec![
            DisplayEvent::FinalAnswerStarted,
            DisplayEvent::Fragment(StyledFragment::plain("42")),
            DisplayEvent::FinalAnswerFinished,
        ]);
        assert!(out.ends_with("Final Answer\n42\n"));
    }
}
