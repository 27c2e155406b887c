/*!
 * Breakdown of a column of categorical labels.
 */

/// How often a label occurs in a group.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelShare<'a> {
    pub label: &'a str,
    pub count: usize,
    /// count / total, in the range (0, 1].
    pub fraction: f64,
}

/// The fraction of a group made up by each distinct label.
///
/// Labels are kept in the order they were first encountered.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Distribution<'a> {
    shares: Vec<LabelShare<'a>>,
    total: usize,
}

/// The most common label of a group, when it is common enough.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Predominant<'a> {
    pub label: &'a str,
    pub fraction: f64,
}

impl<'a> Distribution<'a> {
    /// Tally the labels.
    pub fn new<I>(labels: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut shares: Vec<LabelShare<'a>> = vec![];
        let mut total = 0;

        // The vocabularies are tiny, a linear search beats hashing here.
        for label in labels {
            total += 1;
            match shares.iter_mut().find(|share| share.label == label) {
                Some(share) => share.count += 1,
                None => shares.push(LabelShare {
                    label,
                    count: 1,
                    fraction: 0.0,
                }),
            }
        }

        for share in shares.iter_mut() {
            share.fraction = share.count as f64 / total as f64;
        }

        Distribution { shares, total }
    }

    /// The number of labels tallied.
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Every distinct label, in the order first encountered.
    pub fn shares(&self) -> &[LabelShare<'a>] {
        &self.shares
    }

    /// The fraction of the group carrying `label`, 0.0 if it never occurs.
    pub fn fraction(&self, label: &str) -> f64 {
        self.shares
            .iter()
            .find(|share| share.label == label)
            .map(|share| share.fraction)
            .unwrap_or(0.0)
    }

    /// The number of members carrying `label`.
    pub fn count(&self, label: &str) -> usize {
        self.shares
            .iter()
            .find(|share| share.label == label)
            .map(|share| share.count)
            .unwrap_or(0)
    }

    /// The most frequent label, if its fraction is at least `threshold`.
    ///
    /// Ties go to the label encountered first.
    pub fn predominant(&self, threshold: f64) -> Option<Predominant<'a>> {
        let mut best: Option<&LabelShare<'a>> = None;
        for share in &self.shares {
            match best {
                Some(b) if b.count >= share.count => {}
                _ => best = Some(share),
            }
        }

        best.filter(|share| share.fraction >= threshold)
            .map(|share| Predominant {
                label: share.label,
                fraction: share.fraction,
            })
    }
}

/// Percentage breakdown of a column of labels.
pub fn distribution<'a, I>(labels: I) -> Distribution<'a>
where
    I: IntoIterator<Item = &'a str>,
{
    Distribution::new(labels)
}

/// The most frequent label and its fraction, or `None` if it falls short of `threshold` or there
/// are no labels at all.
pub fn predominant<'a, I>(labels: I, threshold: f64) -> Option<Predominant<'a>>
where
    I: IntoIterator<Item = &'a str>,
{
    Distribution::new(labels).predominant(threshold)
}
