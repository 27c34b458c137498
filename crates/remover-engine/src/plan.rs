use super::*;

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedRemoval {
    pub candidate: Candidate,
    pub tier: RiskTier,
}

/// Confirmed, ordered set of deletions. Immutable once built; descendants
/// always come before their ancestors and files before directories.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemovalPlan {
    items: Vec<PlannedRemoval>,
}

impl RemovalPlan {
    /// Builds a plan from the paths the user confirmed. Every confirmed path
    /// must be a classified candidate and none may be excluded. Tiers are
    /// re-derived from `policy`; the stricter of the supplied and the
    /// re-derived tier counts.
    pub fn build(
        classified: &[ClassifiedCandidate],
        confirmed: &[PathBuf],
        policy: &RiskPolicy,
    ) -> AppResult<Self> {
        let mut items = Vec::with_capacity(confirmed.len());
        for path in confirmed {
            let Some(found) = classified
                .iter()
                .find(|item| &item.candidate.path == path)
            else {
                return Err(engine_error(
                    EngineErrorCode::PlanUnknownCandidate,
                    "confirmed path was not produced by classification",
                )
                .with_context("path", path.display().to_string()));
            };
            let tier = verified_tier(found, policy);
            if tier == RiskTier::Excluded {
                return Err(engine_error(
                    EngineErrorCode::PlanContainsExcluded,
                    "excluded candidates cannot be removed",
                )
                .with_context("path", path.display().to_string()));
            }
            items.push(PlannedRemoval {
                candidate: found.candidate.clone(),
                tier,
            });
        }
        Ok(Self::ordered(items))
    }

    /// Every Safe candidate, plus Caution ones when asked.
    pub fn from_tiers(
        classified: &[ClassifiedCandidate],
        include_caution: bool,
        policy: &RiskPolicy,
    ) -> Self {
        Self::select(classified, policy, |item, tier| match tier {
            RiskTier::Safe => true,
            RiskTier::Caution => include_caution,
            RiskTier::Excluded => false,
        })
    }

    /// Reset plan: Safe leftovers only, the application bundle stays.
    pub fn leftovers(classified: &[ClassifiedCandidate], policy: &RiskPolicy) -> Self {
        Self::select(classified, policy, |item, tier| {
            tier == RiskTier::Safe && item.candidate.root_kind != PathRootKind::Bundle
        })
    }

    fn select(
        classified: &[ClassifiedCandidate],
        policy: &RiskPolicy,
        keep: impl Fn(&ClassifiedCandidate, RiskTier) -> bool,
    ) -> Self {
        let items = classified
            .iter()
            .filter_map(|item| {
                let tier = verified_tier(item, policy);
                keep(item, tier).then(|| PlannedRemoval {
                    candidate: item.candidate.clone(),
                    tier,
                })
            })
            .collect();
        Self::ordered(items)
    }

    pub fn items(&self) -> &[PlannedRemoval] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.items
            .iter()
            .map(|item| item.candidate.size_bytes)
            .fold(0u64, u64::saturating_add)
    }

    fn ordered(mut items: Vec<PlannedRemoval>) -> Self {
        let mut seen = HashSet::new();
        items.retain(|item| seen.insert(item.candidate.path.clone()));
        items.sort_by(|left, right| {
            let left_path = &left.candidate.path;
            let right_path = &right.candidate.path;
            path_depth(right_path)
                .cmp(&path_depth(left_path))
                .then(
                    kind_rank(left.candidate.entry_kind)
                        .cmp(&kind_rank(right.candidate.entry_kind)),
                )
                .then(left_path.cmp(right_path))
        });
        Self { items }
    }
}

/// Classification carried by a caller is never trusted on its own.
fn verified_tier(item: &ClassifiedCandidate, policy: &RiskPolicy) -> RiskTier {
    let derived = classify_candidate(item.candidate.clone(), policy).tier;
    if derived != item.tier {
        tracing::warn!(
            event = "plan_tier_mismatch",
            path = %sanitize_path(&item.candidate.path),
            supplied = item.tier.as_str(),
            derived = derived.as_str()
        );
    }
    if severity(derived) > severity(item.tier) {
        derived
    } else {
        item.tier
    }
}

fn severity(tier: RiskTier) -> u8 {
    match tier {
        RiskTier::Safe => 0,
        RiskTier::Caution => 1,
        RiskTier::Excluded => 2,
    }
}

fn kind_rank(kind: EntryKind) -> u8 {
    match kind {
        EntryKind::File | EntryKind::Symlink => 0,
        EntryKind::Directory => 1,
    }
}

#[cfg(test)]
#[path = "../tests/removal/plan_tests.rs"]
mod plan_tests;
