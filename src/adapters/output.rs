use crate::domain::ScanResult;
use crate::ports::OutputPort;
use anyhow::Result;
use console::style;
use std::path::Path;

struct OutputWriter {
    output_file: Option<String>,
}

impl OutputWriter {
    fn new() -> Self {
        Self { output_file: None }
    }

    fn with_file(path: &Path) -> Result<Self> {
        Ok(Self {
            output_file: Some(path.to_string_lossy().to_string()),
        })
    }

    fn write_content(&self, content: &str) -> Result<()> {
        match &self.output_file {
            Some(path) => {
                std::fs::write(path, content)?;
            }
            None => {
                print!("{}", content);
            }
        }
        Ok(())
    }
}

pub struct ConsoleOutputAdapter {
    summary_only: bool,
}

impl ConsoleOutputAdapter {
    pub fn new() -> Self {
        Self {
            summary_only: false,
        }
    }

    pub fn with_summary_only(mut self, summary_only: bool) -> Self {
        self.summary_only = summary_only;
        self
    }
}

impl Default for ConsoleOutputAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputPort for ConsoleOutputAdapter {
    fn write_results(&self, results: &ScanResult) -> Result<()> {
        println!("\n=== QC Scan Results ===");
        println!("Subjects: {}", results.total_subjects());
        println!("Images: {}", results.total_images());

        if results.is_empty() {
            println!("\nNo images found!");
            return Ok(());
        }

        if !self.summary_only {
            println!("\n=== Subjects ===");
            for subject in &results.subject_list {
                let images = results.images_for(subject);
                let start = results.subject_start(subject).unwrap_or_default();
                println!(
                    "{} {} ({} images, starting at #{})",
                    style("•").cyan(),
                    style(subject).bold(),
                    images.len(),
                    start + 1
                );
            }
        }

        Ok(())
    }
}

pub struct JsonOutputAdapter {
    writer: OutputWriter,
}

impl JsonOutputAdapter {
    pub fn with_file(path: &Path) -> Result<Self> {
        Ok(Self {
            writer: OutputWriter::with_file(path)?,
        })
    }

    pub fn with_stdout() -> Self {
        Self {
            writer: OutputWriter::new(),
        }
    }
}

impl OutputPort for JsonOutputAdapter {
    fn write_results(&self, results: &ScanResult) -> Result<()> {
        let json = serde_json::to_string_pretty(results)?;
        self.writer.write_content(&format!("{}\n", json))
    }
}

pub struct CsvOutputAdapter {
    writer: OutputWriter,
}

impl CsvOutputAdapter {
    pub fn with_file(path: &Path) -> Result<Self> {
        Ok(Self {
            writer: OutputWriter::with_file(path)?,
        })
    }

    pub fn with_stdout() -> Self {
        Self {
            writer: OutputWriter::new(),
        }
    }

    fn format_csv_string(&self, results: &ScanResult) -> String {
        let mut output = String::new();
        output.push_str("index,subject,path,gif\n");
        for subject in &results.subject_list {
            let start = results.subject_start(subject).unwrap_or_default();
            let gif = results.subject_gifs.get(subject).map(String::as_str).unwrap_or("");
            for (offset, image) in results.images_for(subject).iter().enumerate() {
                output.push_str(&format!(
                    "{},{},{},{}\n",
                    start + offset,
                    csv_field(subject),
                    csv_field(image),
                    csv_field(gif)
                ));
            }
        }

        output
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

impl OutputPort for CsvOutputAdapter {
    fn write_results(&self, results: &ScanResult) -> Result<()> {
        let csv_content = self.format_csv_string(results);
        self.writer.write_content(&csv_content)
    }
}

pub struct TreeOutputAdapter {
    writer: OutputWriter,
}

impl TreeOutputAdapter {
    pub fn with_file(path: &Path) -> Result<Self> {
        Ok(Self {
            writer: OutputWriter::with_file(path)?,
        })
    }

    pub fn with_stdout() -> Self {
        Self {
            writer: OutputWriter::new(),
        }
    }

    fn format_tree_output(&self, results: &ScanResult) -> String {
        let mut output = String::new();
        output.push_str(&format!(
            "QC index ({} subjects, {} images)\n",
            results.total_subjects(),
            results.total_images()
        ));

        let subject_count = results.subject_list.len();
        for (i, subject) in results.subject_list.iter().enumerate() {
            let is_last_subject = i == subject_count - 1;
            let branch = if is_last_subject { "└── " } else { "├── " };
            let indent = if is_last_subject { "    " } else { "│   " };

            let gif = results.subject_gifs.get(subject).map(String::as_str).unwrap_or("-");
            output.push_str(&format!("{}{} [{}]\n", branch, subject, gif));

            let images = results.images_for(subject);
            for (j, image) in images.iter().enumerate() {
                let leaf = if j == images.len() - 1 { "└── " } else { "├── " };
                output.push_str(&format!("{}{}{}\n", indent, leaf, image));
            }
        }

        output
    }
}

impl OutputPort for TreeOutputAdapter {
    fn write_results(&self, results: &ScanResult) -> Result<()> {
        let tree = self.format_tree_output(results);
        self.writer.write_content(&tree)
    }
}
