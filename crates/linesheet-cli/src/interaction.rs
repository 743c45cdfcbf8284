//! Terminal output and prompts.

use console::Emoji;
use dialoguer::Confirm;

use super::*;

/// Prefix for information messages
pub static INFO_PREFIX: &str = "ℹ ";
/// Prefix for success messages
pub static SUCCESS_PREFIX: &str = "✓ ";
/// Prefix for error messages
pub static ERROR_PREFIX: &str = "✗ ";
/// Prefix for warning messages
pub static WARNING_PREFIX: &str = "! ";
/// Prefix for user prompts
pub static PROMPT_PREFIX: &str = "❯ ";
/// Branch of a tree listing
pub static ITEM_PREFIX: &str = "├─";
/// Last branch of a tree listing
pub static LAST_ITEM_PREFIX: &str = "└─";

/// Something to show the user.
#[derive(Debug)]
pub enum ResponseContent<'a> {
  /// A completed action
  Success(&'a str),
  /// Progress or context
  Info(&'a str),
  /// Something the user should look at
  Warning(&'a str),
  /// A failure
  Error(&'a LinesheetCliError),
  /// Counts of a finished pass
  Report(&'a BatchReport),
  /// A taxonomy overview, optionally checked against a category
  Taxonomy {
    /// The taxonomy to show
    taxonomy: &'a Taxonomy,
    /// Category to report applicability for
    category: Option<&'a str>,
  },
}

/// How commands talk to the user.
pub trait UserInteraction {
  /// Asks a yes/no question.
  fn confirm(&self, message: &str) -> Result<bool>;
  /// Shows something to the user.
  fn reply(&self, content: ResponseContent) -> Result<()>;
}

impl UserInteraction for Cli {
  fn confirm(&self, message: &str) -> Result<bool> {
    if self.accept_defaults {
      return Ok(true);
    }
    Ok(
      Confirm::new()
        .with_prompt(format!("{}{message}", style(PROMPT_PREFIX).cyan()))
        .default(false)
        .interact()?,
    )
  }

  fn reply(&self, content: ResponseContent) -> Result<()> {
    match content {
      ResponseContent::Success(message) => {
        println!("{} {}", style(SUCCESS_PREFIX).green(), style(message).green())
      },
      ResponseContent::Info(message) => println!("{} {message}", style(INFO_PREFIX).blue()),
      ResponseContent::Warning(message) => {
        println!("{} {}", style(WARNING_PREFIX).yellow(), style(message).yellow())
      },
      ResponseContent::Error(error) => {
        eprintln!("{} {}", style(ERROR_PREFIX).red(), style(error).red())
      },
      ResponseContent::Report(report) => {
        let icon = if report.failed == 0 { Emoji("✨", "*") } else { Emoji("⚠️", "!") };
        println!("{icon} {}", style(&report.name).bold());
        println!("   {ITEM_PREFIX} {} succeeded", style(report.succeeded).green());
        println!("   {ITEM_PREFIX} {} failed", style(report.failed).red());
        println!("   {LAST_ITEM_PREFIX} {} skipped", style(report.skipped).yellow());
      },
      ResponseContent::Taxonomy { taxonomy, category } => {
        println!("{}", style(taxonomy.header().join(" | ")).bold());
        let last = taxonomy.len().saturating_sub(1);
        for (index, attribute) in taxonomy.attributes().iter().enumerate() {
          let branch = if index == last { LAST_ITEM_PREFIX } else { ITEM_PREFIX };
          let scope = attribute.scope.as_deref().unwrap_or("global");
          let applicability = match category {
            Some(category) if taxonomy.is_applicable(category, attribute) => {
              format!(" {}", style("applies").green())
            },
            Some(_) => format!(" {}", style("does not apply").dim()),
            None => String::new(),
          };
          println!(
            "{branch} {} [{}] limit {}, {scope}, {} values{applicability}",
            style(&attribute.label).cyan(),
            attribute.key,
            attribute.selection_limit,
            attribute.allowed_values.len(),
          );
        }
      },
    }
    Ok(())
  }
}
