//! Log-space factorials for likelihood evaluations.

const MAX_LN_ENTRIES: usize = 256;

/// Tabulated `ln(n!)`. Arguments beyond the table are summed directly.
#[derive(Debug, Clone)]
pub struct LnLookup {
    entries: Vec<f64>,
}
impl LnLookup {
    #[inline]
    pub fn get(&self, n: u16) -> f64 {
        match self.entries.get(n as usize) {
            Some(&entry) => entry,
            None => {
                let tail = (MAX_LN_ENTRIES..=n as usize)
                    .map(|i| (i as f64).ln())
                    .sum::<f64>();
                self.entries[MAX_LN_ENTRIES - 1] + tail
            }
        }
    }
}

impl Default for LnLookup {
    fn default() -> Self {
        let mut entries = vec![0.0; MAX_LN_ENTRIES];
        for i in 2..MAX_LN_ENTRIES {
            entries[i] = entries[i - 1] + (i as f64).ln();
        }
        Self { entries }
    }
}
