// src/orchestrator/script.rs

//! Line-based run setup read from stdin.
//!
//! The `interactive` command asks a fixed sequence of questions; the
//! orchestrator answers them by writing a script to the child's stdin.
//! [`read_plan`] and [`input_script`] are the two ends of that protocol.

use std::io::{BufRead, Write};

use crate::error::Result;
use crate::models::CrawlConfig;

/// Page count above which a bounded run asks for confirmation.
const LARGE_RUN_PAGES: u32 = 20;

/// Parameters chosen for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunPlan {
    pub start_page: u32,
    /// `None` means unlimited
    pub max_pages: Option<u32>,
    pub collect_details: bool,
    pub auto_detect_end: bool,
}

impl Default for RunPlan {
    fn default() -> Self {
        Self {
            start_page: 1,
            max_pages: None,
            collect_details: false,
            auto_detect_end: true,
        }
    }
}

impl RunPlan {
    fn bounded(pages: u32) -> Self {
        Self {
            max_pages: Some(pages),
            ..Self::default()
        }
    }

    /// Unlimited and large runs ask before starting.
    pub fn needs_confirmation(&self) -> bool {
        self.max_pages.is_none_or(|n| n > LARGE_RUN_PAGES)
    }

    /// Copy the plan into a crawl configuration.
    pub fn apply(&self, crawl: &mut CrawlConfig) {
        crawl.start_page = self.start_page;
        crawl.max_pages = self.max_pages;
        crawl.collect_details = self.collect_details;
        crawl.auto_detect_end = self.auto_detect_end;
    }

    /// The preset menu entry that produces exactly this plan, if any.
    fn preset(&self) -> Option<ScrapeMode> {
        ScrapeMode::ALL
            .into_iter()
            .find(|mode| mode.plan().as_ref() == Some(self))
    }
}

/// Menu entries of the interactive setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeMode {
    Quick,
    Standard,
    Comprehensive,
    Unlimited,
    UnlimitedDetailed,
    Custom,
}

impl ScrapeMode {
    const ALL: [ScrapeMode; 6] = [
        ScrapeMode::Quick,
        ScrapeMode::Standard,
        ScrapeMode::Comprehensive,
        ScrapeMode::Unlimited,
        ScrapeMode::UnlimitedDetailed,
        ScrapeMode::Custom,
    ];

    pub fn choice(self) -> &'static str {
        match self {
            ScrapeMode::Quick => "1",
            ScrapeMode::Standard => "2",
            ScrapeMode::Comprehensive => "3",
            ScrapeMode::Unlimited => "4",
            ScrapeMode::UnlimitedDetailed => "5",
            ScrapeMode::Custom => "6",
        }
    }

    pub fn from_choice(choice: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.choice() == choice.trim())
    }

    /// The plan a preset selects; `None` for `Custom`.
    pub fn plan(self) -> Option<RunPlan> {
        match self {
            ScrapeMode::Quick => Some(RunPlan::bounded(3)),
            ScrapeMode::Standard => Some(RunPlan::bounded(5)),
            ScrapeMode::Comprehensive => Some(RunPlan::bounded(10)),
            ScrapeMode::Unlimited => Some(RunPlan::default()),
            ScrapeMode::UnlimitedDetailed => Some(RunPlan {
                collect_details: true,
                ..RunPlan::default()
            }),
            ScrapeMode::Custom => None,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ScrapeMode::Quick => "Quick scrape (3 pages, no detailed data)",
            ScrapeMode::Standard => "Standard scrape (5 pages, no detailed data)",
            ScrapeMode::Comprehensive => "Comprehensive scrape (10 pages, no detailed data)",
            ScrapeMode::Unlimited => "UNLIMITED scrape (all pages, no detailed data)",
            ScrapeMode::UnlimitedDetailed => "UNLIMITED with detailed data (WARNING: VERY SLOW)",
            ScrapeMode::Custom => "Custom configuration",
        }
    }
}

/// How the setup dialogue ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanOutcome {
    Run(RunPlan),
    Cancelled,
}

struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    fn say(&mut self, line: &str) -> Result<()> {
        writeln!(self.output, "{line}")?;
        Ok(())
    }

    /// Print `prompt` and read one trimmed line; end of input reads as blank.
    fn ask(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;
        let mut line = String::new();
        self.input.read_line(&mut line)?;
        Ok(line.trim().to_string())
    }

    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        Ok(self.ask(prompt)?.eq_ignore_ascii_case("y"))
    }

    fn custom_plan(&mut self) -> Result<RunPlan> {
        let mut plan = RunPlan::default();

        let start = self.ask("Enter starting page number (default 1): ")?;
        let Some(start) = parse_count(&start, Some(1)) else {
            return self.invalid_input(plan);
        };
        plan.start_page = start;

        let limit = self.ask("Enter number of pages to scrape (leave empty for unlimited): ")?;
        if limit.is_empty() {
            plan.max_pages = None;
            self.say("Unlimited pages selected")?;
        } else {
            let Some(pages) = parse_count(&limit, None) else {
                return self.invalid_input(plan);
            };
            plan.max_pages = Some(pages);
        }

        plan.collect_details =
            self.confirm("Collect detailed data from each property? (y/n, default n): ")?;
        if plan.collect_details && plan.max_pages.is_none() {
            self.say("WARNING: Unlimited pages + detailed data = EXTREMELY SLOW")?;
            if !self.confirm("This could take many hours. Continue? (y/n): ")? {
                plan.collect_details = false;
                self.say("Detailed data collection disabled")?;
            }
        }

        let auto = self.ask("Auto-detect when no more pages? (y/n, default y): ")?;
        plan.auto_detect_end = !auto.eq_ignore_ascii_case("n");
        Ok(plan)
    }

    /// Answers given before the bad one are kept.
    fn invalid_input(&mut self, plan: RunPlan) -> Result<RunPlan> {
        self.say("Invalid input, using defaults")?;
        Ok(plan)
    }
}

/// A positive page number; blank input takes `default` when there is one.
fn parse_count(input: &str, default: Option<u32>) -> Option<u32> {
    if input.is_empty() {
        return default;
    }
    input.parse::<u32>().ok().filter(|n| *n > 0)
}

/// Run the setup dialogue on `input`, echoing prompts to `output`.
pub fn read_plan<R: BufRead, W: Write>(input: R, output: W) -> Result<PlanOutcome> {
    let mut prompter = Prompter { input, output };

    prompter.say("Configuration Options:")?;
    for (i, mode) in ScrapeMode::ALL.iter().enumerate() {
        prompter.say(&format!("{}. {}", i + 1, mode.description()))?;
    }

    let choice = prompter.ask("Select option (1-6): ")?;
    let plan = match ScrapeMode::from_choice(&choice) {
        Some(ScrapeMode::Custom) => prompter.custom_plan()?,
        Some(mode) => {
            if mode == ScrapeMode::UnlimitedDetailed {
                prompter.say("WARNING: This will be VERY SLOW but collect maximum data")?;
                if !prompter.confirm("This could take hours. Continue? (y/n): ")? {
                    prompter.say("Operation cancelled")?;
                    return Ok(PlanOutcome::Cancelled);
                }
            }
            mode.plan().unwrap_or_default()
        }
        None => {
            prompter.say("Invalid choice, using defaults: 5 pages")?;
            RunPlan::bounded(5)
        }
    };

    if plan.needs_confirmation() && !prompter.confirm("Large scrape detected. Continue? (y/n): ")? {
        prompter.say("Operation cancelled")?;
        return Ok(PlanOutcome::Cancelled);
    }

    Ok(PlanOutcome::Run(plan))
}

/// The stdin answers that make [`read_plan`] produce `plan`.
pub fn input_script(plan: &RunPlan) -> String {
    let yes_no = |flag: bool| if flag { "y" } else { "n" }.to_string();
    let mut lines: Vec<String> = Vec::new();

    match plan.preset() {
        Some(mode) => {
            lines.push(mode.choice().to_string());
            if mode == ScrapeMode::UnlimitedDetailed {
                lines.push("y".to_string());
            }
        }
        None => {
            lines.push(ScrapeMode::Custom.choice().to_string());
            lines.push(plan.start_page.to_string());
            lines.push(plan.max_pages.map(|n| n.to_string()).unwrap_or_default());
            lines.push(yes_no(plan.collect_details));
            if plan.collect_details && plan.max_pages.is_none() {
                lines.push("y".to_string());
            }
            lines.push(yes_no(plan.auto_detect_end));
        }
    }

    if plan.needs_confirmation() {
        lines.push("y".to_string());
    }

    let mut script = lines.join("\n");
    script.push('\n');
    script
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn run(input: &str) -> PlanOutcome {
        read_plan(Cursor::new(input.as_bytes()), Vec::<u8>::new()).unwrap()
    }

    #[test]
    fn test_presets() {
        assert_eq!(run("1\n"), PlanOutcome::Run(RunPlan::bounded(3)));
        assert_eq!(run("3\n"), PlanOutcome::Run(RunPlan::bounded(10)));
        assert_eq!(run("4\ny\n"), PlanOutcome::Run(RunPlan::default()));
    }

    #[test]
    fn test_invalid_choice_means_five_pages() {
        assert_eq!(run("9\n"), PlanOutcome::Run(RunPlan::bounded(5)));
        assert_eq!(run(""), PlanOutcome::Run(RunPlan::bounded(5)));
    }

    #[test]
    fn test_declined_confirmation_cancels() {
        assert_eq!(run("4\nn\n"), PlanOutcome::Cancelled);
        assert_eq!(run("5\nn\n"), PlanOutcome::Cancelled);
        // Mode 5 asks twice: once for details, once for the unlimited run.
        assert_eq!(run("5\ny\n"), PlanOutcome::Cancelled);
        assert!(matches!(run("5\ny\ny\n"), PlanOutcome::Run(plan) if plan.collect_details));
    }

    #[test]
    fn test_custom_plan() {
        let plan = run("6\n7\n4\ny\nn\n");
        assert_eq!(
            plan,
            PlanOutcome::Run(RunPlan {
                start_page: 7,
                max_pages: Some(4),
                collect_details: true,
                auto_detect_end: false,
            })
        );
    }

    #[test]
    fn test_custom_blank_answers_take_defaults() {
        // Blank start, unlimited, no details, default auto-detect, confirm.
        assert_eq!(run("6\n\n\n\n\ny\n"), PlanOutcome::Run(RunPlan::default()));
    }

    #[test]
    fn test_custom_declining_slow_run_disables_details() {
        let outcome = run("6\n1\n\ny\nn\ny\ny\n");
        assert_eq!(outcome, PlanOutcome::Run(RunPlan::default()));
    }

    #[test]
    fn test_custom_bad_number_keeps_earlier_answers() {
        let outcome = run("6\n4\nlots\ny\n");
        assert_eq!(
            outcome,
            PlanOutcome::Run(RunPlan {
                start_page: 4,
                ..RunPlan::default()
            })
        );
        assert_eq!(run("6\n0\n"), PlanOutcome::Cancelled);
    }

    #[test]
    fn test_large_bounded_run_asks() {
        assert!(!RunPlan::bounded(20).needs_confirmation());
        assert!(RunPlan::bounded(21).needs_confirmation());
        assert!(RunPlan::default().needs_confirmation());
    }

    #[test]
    fn test_script_reproduces_plan() {
        let plans = [
            RunPlan::bounded(3),
            RunPlan::bounded(5),
            RunPlan::default(),
            RunPlan {
                collect_details: true,
                ..RunPlan::default()
            },
            RunPlan {
                start_page: 12,
                max_pages: Some(30),
                collect_details: true,
                auto_detect_end: false,
            },
            RunPlan {
                start_page: 2,
                max_pages: None,
                collect_details: true,
                auto_detect_end: true,
            },
            // Smallest and boundary runs the dashboard flags can build.
            RunPlan::bounded(1),
            RunPlan::bounded(LARGE_RUN_PAGES),
            RunPlan::bounded(LARGE_RUN_PAGES + 1),
            RunPlan {
                start_page: 9,
                max_pages: Some(3),
                ..RunPlan::default()
            },
            RunPlan {
                max_pages: Some(1),
                collect_details: true,
                auto_detect_end: false,
                ..RunPlan::default()
            },
            RunPlan {
                start_page: u32::MAX,
                max_pages: Some(u32::MAX),
                ..RunPlan::default()
            },
        ];
        for plan in plans {
            assert_eq!(run(&input_script(&plan)), PlanOutcome::Run(plan), "{plan:?}");
        }
    }

    #[test]
    fn test_prompts_are_echoed() {
        let mut output = Vec::new();
        read_plan(Cursor::new(&b"2\n"[..]), &mut output).unwrap();
        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("6. Custom configuration"));
        assert!(output.contains("Select option (1-6): "));
    }

    #[test]
    fn test_apply_overrides_crawl_config() {
        let mut crawl = CrawlConfig::default();
        RunPlan {
            start_page: 3,
            max_pages: Some(2),
            collect_details: true,
            auto_detect_end: false,
        }
        .apply(&mut crawl);
        assert_eq!(crawl.start_page, 3);
        assert_eq!(crawl.end_page(), Some(4));
        assert!(crawl.collect_details);
        assert!(!crawl.auto_detect_end);
    }
}
