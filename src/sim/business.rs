use tracing::info;

use crate::error::CityError;
use crate::id::StructureId;
use crate::model::structure::{FAILURE_TICKS, LOW_PATRONAGE_SHARE};
use crate::model::{BusinessState, City, ResourceType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusinessTransition {
    Failed,
}

/// Fold one long tick of patronage into a business.
///
/// Patrons under `LOW_PATRONAGE_SHARE` of `patron_cap` count toward failure; the
/// `FAILURE_TICKS`th consecutive low tick fails the business. Any adequate tick
/// resets the counter. A failed business stays failed, at zero patronage
/// efficiency, until reopened.
pub fn record_patronage(
    business: &mut BusinessState,
    patrons: f64,
    patron_cap: f64,
) -> Option<BusinessTransition> {
    business.patrons = patrons.max(0.0);
    if business.failed {
        business.patronage_efficiency = 0.0;
        return None;
    }
    if !(patron_cap > 0.0) {
        business.failure_counter = 0;
        business.patronage_efficiency = 1.0;
        return None;
    }

    if business.patrons < LOW_PATRONAGE_SHARE * patron_cap {
        business.failure_counter += 1;
        if business.failure_counter >= FAILURE_TICKS {
            business.failed = true;
            business.patronage_efficiency = 0.0;
            return Some(BusinessTransition::Failed);
        }
    } else {
        business.failure_counter = 0;
    }
    business.patronage_efficiency = (business.patrons / patron_cap).clamp(0.0, 1.0);
    None
}

/// Pay the business's accumulated value to reopen it. Returns the price paid.
pub fn reopen_business(city: &mut City, id: StructureId) -> Result<f64, CityError> {
    let structure = city.require(id)?;
    let Some(business) = structure.business.as_ref().filter(|b| b.failed) else {
        return Err(CityError::NotFailed(id));
    };
    let cost = business.business_value;
    let available = city.flunds();
    if !city
        .ledger
        .spend_if_affordable(&[(ResourceType::Flunds, cost)])
    {
        return Err(CityError::InsufficientFunds {
            needed: cost,
            available,
        });
    }

    let structure = city.expect_structure_mut(id);
    if let Some(business) = structure.business.as_mut() {
        business.failed = false;
        business.failure_counter = 0;
        business.patronage_efficiency = 1.0;
    }
    info!(structure = %id, cost, "business reopened");
    Ok(cost)
}
