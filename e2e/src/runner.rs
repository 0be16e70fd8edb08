//! Sequential test execution and console reporting

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use colored::Colorize;

use crate::types::{SharedBackendState, TestResult};

/// Upper bound for one test; a relay that never ends a stream fails the
/// test instead of hanging the suite
const CASE_TIMEOUT: Duration = Duration::from_secs(30);

const RULE_WIDTH: usize = 51;

pub type TestFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;
pub type TestFn = Box<dyn Fn(TestContext) -> TestFuture + Send + Sync>;

/// A named scenario against the running relay
pub struct TestCase {
    /// `category/name`, e.g. `cloud/missing_key`
    pub name: &'static str,
    pub description: &'static str,
    pub run: TestFn,
}

impl TestCase {
    fn category(&self) -> &'static str {
        self.name.split('/').next().unwrap_or(self.name)
    }

    fn selected_by(&self, filter: Option<&str>) -> bool {
        filter.map_or(true, |f| self.name.contains(f))
    }
}

/// Everything a test needs to talk to the relay and script the upstream
#[derive(Clone)]
pub struct TestContext {
    pub relay_addr: String,
    pub backend_state: SharedBackendState,
    pub http_client: reqwest::Client,
}

impl TestContext {
    /// Forget queued replies and recorded calls left by the previous test
    fn reset_backend(&self) {
        if let Ok(mut state) = self.backend_state.lock() {
            state.response_queue.clear();
            state.received_requests.clear();
        }
    }
}

/// Run the selected cases one at a time and print a report
pub async fn run_tests(cases: Vec<TestCase>, ctx: TestContext, filter: Option<&str>) -> Vec<TestResult> {
    let selected: Vec<&TestCase> = cases.iter().filter(|c| c.selected_by(filter)).collect();

    print_banner(&ctx.relay_addr, selected.len(), filter);

    let mut results = Vec::with_capacity(selected.len());
    let mut category = "";
    for case in selected {
        if case.category() != category {
            category = case.category();
            println!("  {}", category.bright_blue().bold());
        }
        ctx.reset_backend();
        results.push(run_case(case, ctx.clone()).await);
    }

    print_summary(&results);
    results
}

async fn run_case(case: &TestCase, ctx: TestContext) -> TestResult {
    print!("    {} ... ", case.name.bright_white());
    let start = Instant::now();

    let outcome = match tokio::time::timeout(CASE_TIMEOUT, (case.run)(ctx)).await {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!("timed out after {}s", CASE_TIMEOUT.as_secs())),
    };
    let duration_ms = start.elapsed().as_millis() as u64;

    match outcome {
        Ok(()) => {
            println!("{} {}", "ok".bright_green().bold(), format!("{duration_ms}ms").dimmed());
            TestResult {
                name: case.name.to_string(),
                passed: true,
                error: None,
                duration_ms,
            }
        }
        Err(e) => {
            println!("{} {}", "FAILED".bright_red().bold(), format!("{duration_ms}ms").dimmed());
            for (depth, cause) in e.chain().enumerate() {
                let label = if depth == 0 { "error:" } else { "cause:" };
                println!("        {} {}", label.yellow(), cause);
            }
            TestResult {
                name: case.name.to_string(),
                passed: false,
                error: Some(format!("{:#}", e)),
                duration_ms,
            }
        }
    }
}

fn print_banner(relay_addr: &str, count: usize, filter: Option<&str>) {
    let rule = "=".repeat(RULE_WIDTH);
    println!("\n{}", rule.bright_blue());
    println!("  {}", "chat-relay end-to-end".bright_white().bold());
    println!("{}", rule.bright_blue());
    println!("  relay   {}", relay_addr.bright_cyan());
    match filter {
        Some(f) => println!("  tests   {} matching {:?}\n", count.to_string().bright_cyan(), f),
        None => println!("  tests   {}\n", count.to_string().bright_cyan()),
    }
}

fn print_summary(results: &[TestResult]) {
    let failures: Vec<&TestResult> = results.iter().filter(|r| !r.passed).collect();
    let total_ms: u64 = results.iter().map(|r| r.duration_ms).sum();

    println!("\n{}", "-".repeat(RULE_WIDTH).bright_blue());
    for failure in &failures {
        println!(
            "  {} {}: {}",
            "x".bright_red(),
            failure.name,
            failure.error.as_deref().unwrap_or("unknown error")
        );
    }

    let line = format!(
        "  {} passed, {} failed in {:.1}s",
        results.len() - failures.len(),
        failures.len(),
        total_ms as f64 / 1000.0
    );
    if failures.is_empty() {
        println!("{}\n", line.bright_green().bold());
    } else {
        println!("{}\n", line.bright_red().bold());
    }
}

/// Print test names grouped by category
pub fn list_tests(cases: &[TestCase]) {
    let mut category = "";
    for case in cases {
        if case.category() != category {
            category = case.category();
            println!("\n{}", category.bright_white().bold());
        }
        println!("  {} {}", format!("{:<40}", case.name).bright_cyan(), case.description);
    }
    println!();
}
