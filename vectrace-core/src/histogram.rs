//! Luminance/channel histogram with multilevel Otsu thresholding

use std::collections::HashMap;

use image::DynamicImage;
use once_cell::unsync::OnceCell;

use crate::luminance::{luminance, LuminanceData};

const LEVELS: usize = 256;

/// Channel a histogram is built over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Luminance,
    Red,
    Green,
    Blue,
}

/// Statistics over a level range, cached per `(level_min, level_max)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelStats {
    pub pixels: u64,
    pub mean: f64,
    pub median: u8,
    pub std_dev: f64,
    pub unique: u32,
    pub min: u8,
    pub max: u8,
}

/// 256-bin pixel-count histogram over an 8-bit channel.
///
/// The Otsu "between-class weight" table `H[a][b] = w(a..b) * mean(a..b)^2`
/// is built lazily on first use and shared by the single and multilevel
/// threshold queries.
#[derive(Debug)]
pub struct Histogram {
    data: [u32; LEVELS],
    pixels: u64,
    lookup: OnceCell<Box<[f64]>>,
    stats_cache: HashMap<(u8, u8), LevelStats>,
}

impl Default for Histogram {
    fn default() -> Self {
        Self {
            data: [0; LEVELS],
            pixels: 0,
            lookup: OnceCell::new(),
            stats_cache: HashMap::new(),
        }
    }
}

fn lut_index(a: u8, b: u8) -> usize {
    a as usize * LEVELS + b as usize
}

fn normalize_range(level_min: u8, level_max: u8) -> (u8, u8) {
    if level_min <= level_max {
        (level_min, level_max)
    } else {
        (level_max, level_min)
    }
}

impl Histogram {
    /// Build from a luminance grid
    pub fn from_luminance(lum: &LuminanceData) -> Self {
        let mut h = Self::default();
        for &v in lum.data() {
            h.data[v as usize] += 1;
        }
        h.pixels = lum.data().len() as u64;
        h
    }

    /// Build from a decoded image over the selected channel
    pub fn from_image(image: &DynamicImage, channel: Channel) -> Self {
        let rgba = image.to_rgba8();
        let mut h = Self::default();
        for p in rgba.pixels() {
            let [r, g, b, _] = p.0;
            let v = match channel {
                Channel::Luminance => luminance(r, g, b),
                Channel::Red => r,
                Channel::Green => g,
                Channel::Blue => b,
            };
            h.data[v as usize] += 1;
        }
        h.pixels = rgba.width() as u64 * rgba.height() as u64;
        h
    }

    #[cfg(test)]
    pub(crate) fn from_counts(counts: &[(u8, u32)]) -> Self {
        let mut h = Self::default();
        for &(level, count) in counts {
            h.data[level as usize] += count;
            h.pixels += count as u64;
        }
        h
    }

    pub fn pixels(&self) -> u64 {
        self.pixels
    }

    pub fn count(&self, level: u8) -> u32 {
        self.data[level as usize]
    }

    fn lookup_table(&self) -> &[f64] {
        self.lookup.get_or_init(|| {
            // Prefix probability and prefix mean tables, then
            // H[a][b] = (S_b - S_a)^2 / (P_b - P_a) for every closed range.
            let total = self.pixels.max(1) as f64;
            let mut p = [0f64; LEVELS + 1];
            let mut s = [0f64; LEVELS + 1];
            for i in 1..=LEVELS {
                let count = self.data[i - 1] as f64 / total;
                p[i] = p[i - 1] + count;
                s[i] = s[i - 1] + (i - 1) as f64 * count;
            }

            let mut h = vec![0f64; LEVELS * LEVELS].into_boxed_slice();
            for a in 0..LEVELS {
                for b in a..LEVELS {
                    let pw = p[b + 1] - p[a];
                    let sw = s[b + 1] - s[a];
                    h[a * LEVELS + b] = if pw > 0.0 { sw * sw / pw } else { 0.0 };
                }
            }
            h
        })
    }

    /// Single automatic threshold (multilevel Otsu with k = 1).
    ///
    /// Between-class variance is flat between well separated modes; the
    /// midpoint of the arg-max plateau is returned so that bimodal inputs
    /// split between the modes instead of at the first one.
    pub fn auto_threshold(&self, level_min: u8, level_max: u8) -> Option<u8> {
        if self.pixels == 0 {
            return None;
        }
        let (min, max) = normalize_range(level_min, level_max);
        if min >= max {
            return None;
        }
        let h = self.lookup_table();

        let mut best = f64::NEG_INFINITY;
        let mut plateau_lo = min;
        let mut plateau_hi = min;
        for t in min..max {
            let sig = h[lut_index(min, t)] + h[lut_index(t + 1, max)];
            if sig > best {
                best = sig;
                plateau_lo = t;
                plateau_hi = t;
            } else if sig == best {
                plateau_hi = t;
            }
        }
        Some(((plateau_lo as u32 + plateau_hi as u32) / 2) as u8)
    }

    /// The `amount` thresholds t_1 < ... < t_k in `[level_min, level_max]`
    /// maximizing the summed between-class weight of the induced segments.
    ///
    /// Brute-force enumeration over increasing tuples; interactive for
    /// k <= 4, combinatorial beyond that.
    pub fn multilevel_thresholds(&self, amount: u32, level_min: u8, level_max: u8) -> Vec<u8> {
        let (min, max) = normalize_range(level_min, level_max);
        let amount = (amount as i64).min(max as i64 - min as i64 - 2);
        if amount < 1 || self.pixels == 0 {
            return Vec::new();
        }
        let h = self.lookup_table();

        let mut best_sig = f64::NEG_INFINITY;
        let mut best = Vec::new();
        let mut stack = Vec::with_capacity(amount as usize);
        walk_thresholds(
            h,
            min,
            max,
            amount as usize,
            &mut stack,
            0.0,
            &mut best_sig,
            &mut best,
        );
        best
    }

    /// The level in `[level_min, level_max]` with the highest count, using a
    /// `tolerance`-bin sliding window; the window center of the best window
    /// wins, ties preferring the taller own bin.
    pub fn dominant_color(&self, level_min: u8, level_max: u8, tolerance: u8) -> Option<u8> {
        let (min, max) = normalize_range(level_min, level_max);
        let tolerance = tolerance.max(1) as i32;

        if min == max {
            return (self.data[min as usize] > 0).then_some(min);
        }

        let mut dominant: Option<u8> = None;
        let mut dominant_sum = 0u64;
        for i in min..=max {
            let mut sum = 0u64;
            for j in 0..tolerance {
                let level = i as i32 + j - tolerance / 2;
                if (0..LEVELS as i32).contains(&level) {
                    sum += self.data[level as usize] as u64;
                }
            }
            let taller_bin = dominant
                .map(|d| self.data[i as usize] > self.data[d as usize])
                .unwrap_or(true);
            if sum > dominant_sum || (sum == dominant_sum && taller_bin) {
                dominant = Some(i);
                dominant_sum = sum;
            }
        }

        (dominant_sum > 0).then(|| dominant.unwrap())
    }

    /// Pixel statistics over a closed level range
    pub fn stats(&mut self, level_min: u8, level_max: u8) -> LevelStats {
        let key = normalize_range(level_min, level_max);
        if let Some(cached) = self.stats_cache.get(&key) {
            return *cached;
        }

        let (min, max) = key;
        let mut pixels = 0u64;
        let mut weighted = 0f64;
        let mut unique = 0u32;
        let mut lo = None;
        let mut hi = min;
        for v in min..=max {
            let c = self.data[v as usize];
            if c > 0 {
                pixels += c as u64;
                weighted += v as f64 * c as f64;
                unique += 1;
                lo.get_or_insert(v);
                hi = v;
            }
        }

        let stats = if pixels == 0 {
            LevelStats {
                pixels: 0,
                mean: 0.0,
                median: min,
                std_dev: 0.0,
                unique: 0,
                min,
                max: min,
            }
        } else {
            let mean = weighted / pixels as f64;
            let mut variance = 0f64;
            for v in min..=max {
                let c = self.data[v as usize] as f64;
                variance += c * (v as f64 - mean) * (v as f64 - mean);
            }
            let mut cumulative = 0u64;
            let mut median = min;
            for v in min..=max {
                cumulative += self.data[v as usize] as u64;
                if cumulative * 2 >= pixels {
                    median = v;
                    break;
                }
            }
            LevelStats {
                pixels,
                mean,
                median,
                std_dev: (variance / pixels as f64).sqrt(),
                unique,
                min: lo.unwrap(),
                max: hi,
            }
        };

        self.stats_cache.insert(key, stats);
        stats
    }
}

#[allow(clippy::too_many_arguments)]
fn walk_thresholds(
    h: &[f64],
    min: u8,
    max: u8,
    remaining: usize,
    stack: &mut Vec<u8>,
    acc: f64,
    best_sig: &mut f64,
    best: &mut Vec<u8>,
) {
    let seg_start = stack.last().map(|&t| t + 1).unwrap_or(min);
    if remaining == 0 {
        let sig = acc + h[lut_index(seg_start, max)];
        if sig > *best_sig {
            *best_sig = sig;
            best.clear();
            best.extend_from_slice(stack);
        }
        return;
    }

    // leave room below `max` for the remaining thresholds
    let last = max - remaining as u8;
    for t in seg_start..=last {
        let seg = h[lut_index(seg_start, t)];
        stack.push(t);
        walk_thresholds(h, min, max, remaining - 1, stack, acc + seg, best_sig, best);
        stack.pop();
    }
}
