//! Balance simulator: a greedy bot plays the game headless.
//! Run with: cargo test simulate_greedy -- --nocapture

#[cfg(test)]
mod tests {
    use crate::catalog::{Catalog, UpgradeEffect};
    use crate::logic;
    use crate::multiplier::estimated_rate;
    use crate::state::ProgressionState;

    /// Assumed click rate of an active player.
    const CLICKS_PER_SECOND: u32 = 5;
    const TICKS_PER_SECOND: u32 = 10;

    /// What to purchase next.
    enum Purchase {
        Device(String),
        Upgrade(String),
    }

    /// Production gained per second by buying `upgrade`, measured on a
    /// scratch copy of the state. Click upgrades count at the assumed click
    /// rate.
    fn upgrade_gain(catalog: &Catalog, state: &ProgressionState, effect: &UpgradeEffect) -> f64 {
        let before_rate = estimated_rate(catalog, state);
        let before_click = logic::click_value(state, before_rate);
        let mut scratch = state.clone();
        logic::apply_effect(&mut scratch, effect);
        let after_rate = estimated_rate(catalog, &scratch);
        let after_click = logic::click_value(&scratch, after_rate);
        (after_rate - before_rate) + (after_click - before_click) * CLICKS_PER_SECOND as f64
    }

    /// Find the affordable purchase with the lowest payback time.
    fn find_best_purchase(catalog: &Catalog, state: &ProgressionState) -> Option<Purchase> {
        let mut best: Option<(f64, Purchase)> = None; // (payback_seconds, purchase)
        let rate = estimated_rate(catalog, state);

        for def in catalog.devices() {
            if !state.is_revealed(&def.id) || !logic::can_afford_device(state, &def.id) {
                continue;
            }
            let mut scratch = state.clone();
            if let Some(d) = scratch.device_mut(&def.id) {
                d.count += 1;
            }
            let gain = estimated_rate(catalog, &scratch) - rate;
            let cost = state.device(&def.id).map_or(f64::INFINITY, |d| d.cost);
            if gain > 0.0 {
                let payback = cost / gain;
                let dominated = best.as_ref().is_some_and(|(bp, _)| *bp <= payback);
                if !dominated {
                    best = Some((payback, Purchase::Device(def.id.clone())));
                }
            }
        }

        for upgrade in logic::available_upgrades(catalog, state) {
            if state.total_data < upgrade.cost {
                continue;
            }
            let gain = upgrade_gain(catalog, state, &upgrade.effect);
            if gain > 0.0 {
                let payback = upgrade.cost / gain;
                let dominated = best.as_ref().is_some_and(|(bp, _)| *bp <= payback);
                if !dominated {
                    best = Some((payback, Purchase::Upgrade(upgrade.id.clone())));
                }
            }
        }

        best.map(|(_, p)| p)
    }

    fn report_stats(catalog: &Catalog, state: &ProgressionState, second: u32, purchases: u32) {
        let owned: Vec<String> = catalog
            .devices()
            .iter()
            .filter(|d| state.device_count(&d.id) > 0)
            .map(|d| format!("{}×{}", d.id, state.device_count(&d.id)))
            .collect();
        eprintln!(
            "[{second:>5}s] data={:.0} earned={:.0} rate={:.1}/s upgrades={} achievements={} purchases={purchases}",
            state.total_data,
            state.total_earned,
            estimated_rate(catalog, state),
            state.upgrades.len(),
            state.achievements.len(),
        );
        eprintln!("         {}", owned.join(" "));
    }

    fn simulate(total_seconds: u32) -> ProgressionState {
        let catalog = Catalog::standard();
        let mut state = ProgressionState::new(&catalog);
        let mut total_purchases = 0u32;

        for second in 1..=total_seconds {
            let rate = estimated_rate(&catalog, &state);
            for _ in 0..CLICKS_PER_SECOND {
                logic::click(&catalog, &mut state, rate);
            }
            for _ in 0..TICKS_PER_SECOND {
                logic::advance(&catalog, &mut state, 1.0 / TICKS_PER_SECOND as f64);
            }

            // Buy greedily until nothing worthwhile is affordable.
            while let Some(purchase) = find_best_purchase(&catalog, &state) {
                let bought = match &purchase {
                    Purchase::Device(id) => logic::buy_device(&catalog, &mut state, id),
                    Purchase::Upgrade(id) => logic::buy_upgrade(&catalog, &mut state, id),
                };
                if bought.is_err() {
                    break;
                }
                total_purchases += 1;
            }

            if second % 120 == 0 {
                report_stats(&catalog, &state, second, total_purchases);
            }
        }

        state
    }

    #[test]
    fn simulate_greedy_10min() {
        let state = simulate(600);
        assert!(state.total_earned > 15_000.0, "earned {}", state.total_earned);
        assert!(state.device_count("punchCard") >= 5);
        assert!(state.device_count("floppy") >= 1);
        assert!(state.is_revealed("floppy"));
        assert!(state.has_achievement("d_count_punchCard_0"));
    }

    #[test]
    fn simulate_greedy_30min_reaches_later_tiers() {
        let state = simulate(1800);
        assert!(state.device_count("zipDrive") >= 1);
        assert!(!state.upgrades.is_empty());
    }
}
