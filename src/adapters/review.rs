use crate::adapters::CheckpointAdapter;
use crate::ports::{ProgressPort, TraversalPort};
use crate::services::{DirectoryIndex, ReviewSession};
use anyhow::Result;
use console::{style, Term};
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    NextImage,
    PrevImage,
    ToggleReject,
    NextSubject,
    PrevSubject,
    Filter,
    Save,
    Quit,
}

const ACTIONS: [(Action, &str); 8] = [
    (Action::NextImage, "Next image"),
    (Action::PrevImage, "Previous image"),
    (Action::ToggleReject, "Toggle accept/reject"),
    (Action::NextSubject, "Next subject"),
    (Action::PrevSubject, "Previous subject"),
    (Action::Filter, "Filter subjects"),
    (Action::Save, "Save checkpoint"),
    (Action::Quit, "Quit"),
];

/// Terminal review loop over a scanned index.
pub struct InteractiveReviewAdapter {
    term: Term,
    checkpoint: CheckpointAdapter,
    checkpoint_path: Option<PathBuf>,
}

impl InteractiveReviewAdapter {
    pub fn new() -> Self {
        Self {
            term: Term::stdout(),
            checkpoint: CheckpointAdapter::new(),
            checkpoint_path: None,
        }
    }

    pub fn with_checkpoint_path(mut self, path: Option<PathBuf>) -> Self {
        self.checkpoint_path = path;
        self
    }

    fn ensure_cursor_visible(&self) {
        let _ = self.term.show_cursor();
    }

    fn render<T, P>(&self, index: &DirectoryIndex<T, P>, review: &ReviewSession) -> Result<()>
    where
        T: TraversalPort + Send + Sync,
        P: ProgressPort + Send + Sync,
    {
        self.term.clear_screen()?;
        println!("{}", style("bqc - Image Quality Control").bold());
        let hidden = review.hidden_rejected_count();
        if hidden > 0 {
            println!(
                "Image {}  |  {} rejected ({} more hidden by filter)",
                review.position_label(),
                review.rejected_count(),
                hidden
            );
        } else {
            println!("Image {}  |  {} rejected", review.position_label(), review.rejected_count());
        }

        let Some(image) = review.current_image() else {
            println!("\nNo images to review.");
            return Ok(());
        };

        let subject = index.subject_at_index(review.current_index()).unwrap_or("?");
        println!("Subject: {}", style(subject).cyan());
        match review.current_info() {
            Some(Ok(info)) => println!("Image:   {} (repetition {})", info.image_name, info.repetition),
            Some(Err(e)) => log::debug!("{}", e),
            None => {}
        }
        println!("PNG:     {}", review.input_dir().join(image).display());
        if let Some(gif) = index.gif_for_subject(subject) {
            println!("GIF:     {}", review.input_dir().join(gif).display());
        }

        if review.is_current_rejected() {
            println!("Status:  {}", style("REJECTED").red().bold());
        } else {
            println!("Status:  {}", style("ACCEPTED").green().bold());
        }
        println!();

        Ok(())
    }

    fn save(&self, review: &ReviewSession) -> Result<()> {
        let path = match &self.checkpoint_path {
            Some(path) => path.clone(),
            None => {
                let input: String = Input::with_theme(&ColorfulTheme::default())
                    .with_prompt("Checkpoint file")
                    .interact_text()?;
                PathBuf::from(input)
            }
        };

        let hidden = review.hidden_rejected_count();
        if hidden > 0 {
            log::warn!("{} rejected images are hidden by the filter and not saved", hidden);
        }

        match self.checkpoint.save_checkpoint(&path, &review.to_session()) {
            Ok(()) => println!("{} Checkpoint saved to {}", style("✓").green(), path.display()),
            Err(e) => {
                log::error!("Error saving checkpoint: {}", e);
                println!("{} Error saving checkpoint: {}", style("✗").red(), e);
            }
        }
        Ok(())
    }

    pub fn run<T, P>(&self, index: &mut DirectoryIndex<T, P>, review: &mut ReviewSession) -> Result<()>
    where
        T: TraversalPort + Send + Sync,
        P: ProgressPort + Send + Sync,
    {
        let term_clone = self.term.clone();
        ctrlc::set_handler(move || {
            let _ = term_clone.show_cursor();
            std::process::exit(0);
        })?;

        let labels: Vec<&str> = ACTIONS.iter().map(|(_, label)| *label).collect();
        let mut default = 0;

        loop {
            self.render(index, review)?;

            let selection = Select::with_theme(&ColorfulTheme::default())
                .with_prompt("Action")
                .items(&labels)
                .default(default)
                .interact()?;
            default = selection;

            match ACTIONS[selection].0 {
                Action::NextImage => {
                    review.next_image();
                }
                Action::PrevImage => {
                    review.prev_image();
                }
                Action::ToggleReject => {
                    review.toggle_rejection();
                }
                Action::NextSubject => {
                    let target = index.next_subject_index(review.current_index());
                    review.jump_to(target);
                }
                Action::PrevSubject => {
                    let target = index.prev_subject_index(review.current_index());
                    review.jump_to(target);
                }
                Action::Filter => {
                    let pattern: String = Input::with_theme(&ColorfulTheme::default())
                        .with_prompt("Subject filter (regex or text, empty for all)")
                        .allow_empty(true)
                        .interact_text()?;
                    let root = review.input_dir().to_path_buf();
                    let filter = Some(pattern.as_str()).filter(|p| !p.is_empty());
                    let images = index.scan_directory(&root, filter).to_vec();
                    review.replace_images(images);
                }
                Action::Save => self.save(review)?,
                Action::Quit => {
                    if self.checkpoint_path.is_some()
                        && !review.is_empty()
                        && Confirm::with_theme(&ColorfulTheme::default())
                            .with_prompt("Save checkpoint before quitting?")
                            .default(true)
                            .interact()?
                    {
                        self.save(review)?;
                    }
                    break;
                }
            }
        }

        self.ensure_cursor_visible();
        Ok(())
    }
}

impl Default for InteractiveReviewAdapter {
    fn default() -> Self {
        Self::new()
    }
}
