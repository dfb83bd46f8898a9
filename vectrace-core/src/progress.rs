//! Synchronous progress reporting with subrange composition

/// Progress handle mapping a stage's local `[0, 1]` onto a slice of the
/// overall unit interval. Stages receive a subrange and never see the
/// global picture, so nested reporting composes without shared state.
pub struct Progress<'a> {
    callback: Option<&'a mut dyn FnMut(f64)>,
    lo: f64,
    hi: f64,
}

impl<'a> Progress<'a> {
    /// A handle that reports nowhere
    pub fn none() -> Self {
        Self {
            callback: None,
            lo: 0.0,
            hi: 1.0,
        }
    }

    /// Wrap a callback covering the whole unit interval
    pub fn new(callback: &'a mut dyn FnMut(f64)) -> Self {
        Self {
            callback: Some(callback),
            lo: 0.0,
            hi: 1.0,
        }
    }

    /// Report a fraction of this handle's range, clamped to `[0, 1]`
    pub fn report(&mut self, fraction: f64) {
        if let Some(callback) = self.callback.as_mut() {
            let f = fraction.clamp(0.0, 1.0);
            callback(self.lo + f * (self.hi - self.lo));
        }
    }

    /// A handle covering the sub-interval `[from, to]` of this one
    pub fn subrange<'b>(&'b mut self, from: f64, to: f64) -> Progress<'b>
    where
        'a: 'b,
    {
        let span = self.hi - self.lo;
        let lo = self.lo + from.clamp(0.0, 1.0) * span;
        let hi = self.lo + to.clamp(0.0, 1.0) * span;
        let callback: Option<&'b mut dyn FnMut(f64)> = match &mut self.callback {
            Some(c) => Some(&mut **c),
            None => None,
        };
        Progress::<'b> { callback, lo, hi }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subrange_composition() {
        let mut seen = Vec::new();
        let mut cb = |f: f64| seen.push(f);
        {
            let mut progress = Progress::new(&mut cb);
            progress.report(0.0);
            {
                let mut half = progress.subrange(0.5, 1.0);
                half.report(0.5);
                let mut quarter = half.subrange(0.0, 0.5);
                quarter.report(1.0);
            }
            progress.report(1.0);
        }
        assert_eq!(seen, vec![0.0, 0.75, 0.75, 1.0]);
    }

    #[test]
    fn test_none_is_silent() {
        let mut progress = Progress::none();
        progress.report(0.5);
        progress.subrange(0.0, 0.5).report(1.0);
    }
}
