use std::time::Instant;

/// Progress of writing a batch of generated files.
pub struct ProgressIndicator {
    total: usize,
    completed: usize,
    failed: usize,
    start_time: Instant,
}

impl ProgressIndicator {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            completed: 0,
            failed: 0,
            start_time: Instant::now(),
        }
    }

    pub fn complete_item(&mut self, name: &str, error: Option<&str>) {
        match error {
            None => {
                self.completed += 1;
                println!("✓ {} ({}/{})", name, self.completed + self.failed, self.total);
            }
            Some(reason) => {
                self.failed += 1;
                eprintln!("✗ {}: {}", name, reason);
            }
        }
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn finish(&self) {
        let elapsed = self.start_time.elapsed();
        println!("\n{}", "=".repeat(60));
        println!("Summary:");
        println!("  Total:     {}", self.total);
        println!("  Written:   {}", self.completed);
        println!("  Failed:    {}", self.failed);
        println!("  Duration:  {:.2}s", elapsed.as_secs_f64());
        println!("{}", "=".repeat(60));
    }
}
