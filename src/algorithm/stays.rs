//! Hospital and SNF stay cleaning

use chrono::Days;

use crate::algorithm::stats::BuildStats;
use crate::config::StudyWindow;
use crate::models::{RawClaim, Stay, StayKind};

/// Clean raw claims into stays with known discharge dates
///
/// A missing discharge is imputed from the length of stay. Claims with no
/// admission date, with neither discharge nor length of stay, or with a
/// discharge before admission are rejected. Discharges are capped at the
/// study end and stays entirely outside `[lookback, end]` are dropped.
pub fn clean_stays(
    claims: Vec<RawClaim>,
    kind: StayKind,
    window: &StudyWindow,
    stats: &mut BuildStats,
) -> Vec<Stay> {
    let total = claims.len();
    let mut stays = Vec::with_capacity(total);

    for claim in claims {
        let Some(entry_date) = claim.admission_date else {
            stats.rejected_stays += 1;
            continue;
        };

        let (discharge_date, discharge_missing) = match (claim.discharge_date, claim.length_of_stay) {
            (Some(date), _) => (date, false),
            (None, Some(los)) => {
                let Some(date) = u64::try_from(los)
                    .ok()
                    .and_then(|days| entry_date.checked_add_days(Days::new(days)))
                else {
                    stats.rejected_stays += 1;
                    continue;
                };
                (date, true)
            }
            (None, None) => {
                stats.rejected_stays += 1;
                continue;
            }
        };

        if discharge_date < entry_date
            || discharge_date < window.lookback
            || entry_date > window.end
        {
            stats.rejected_stays += 1;
            continue;
        }

        if discharge_missing {
            stats.imputed_stay_discharges += 1;
        }
        stays.push(Stay {
            bene_id: claim.bene_id,
            claim_id: claim.claim_id,
            entry_date,
            discharge_date: discharge_date.min(window.end),
            discharge_missing,
        });
    }

    stays.sort_by(|a, b| {
        (&a.bene_id, a.entry_date, a.discharge_date).cmp(&(&b.bene_id, b.entry_date, b.discharge_date))
    });

    log::info!(
        "Cleaned {kind} claims: kept {} of {total} ({} imputed discharges)",
        stays.len(),
        stays.iter().filter(|s| s.discharge_missing).count()
    );
    stays
}
