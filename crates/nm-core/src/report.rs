use crate::context::RunContext;

/// Summary of what a run applied, printed once at the end.
#[derive(Debug, Default)]
pub struct OptimizationReport {
    steps: Vec<(String, bool)>,
}

impl OptimizationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, step: impl Into<String>, applied: bool) {
        self.steps.push((step.into(), applied));
    }

    pub fn all_applied(&self) -> bool {
        self.steps.iter().all(|(_, applied)| *applied)
    }

    pub fn display(&self, ctx: &RunContext) {
        println!("\n📊 Optimization report");
        println!("{}", "=".repeat(50));
        println!(
            "🌍 Server region: {}",
            if ctx.geo.is_domestic { "domestic (CN)" } else { "overseas" }
        );
        println!("🏳️  Country: {} ({})", ctx.geo.country, ctx.geo.country_code);
        println!("🏙️  City: {}", ctx.geo.city);
        println!("🌐 ISP: {}", ctx.geo.isp);
        if ctx.classification_failed {
            println!("⚠️  Geolocation lookup failed, overseas profile assumed");
        }
        println!("{}", "=".repeat(50));

        for (step, applied) in &self.steps {
            let mark = if *applied { "✅" } else { "❌" };
            println!("  {} {}", mark, step);
        }
    }
}
