//! Property tests for conflict resolution and name normalization.

use proptest::option;
use proptest::prelude::*;

use org_admin::merge::{resolve, BillingResolution, ResolutionPolicy};

#[cfg(feature = "database")]
use org_admin::merge::normalize_name;

fn customer_id() -> impl Strategy<Value = String> {
    "cus_[A-Za-z0-9]{1,12}"
}

fn policy_strategy() -> impl Strategy<Value = Option<ResolutionPolicy>> {
    prop_oneof![
        Just(None),
        Just(Some(ResolutionPolicy::KeepPrimary)),
        Just(Some(ResolutionPolicy::UseSecondary)),
        Just(Some(ResolutionPolicy::KeepBothUnlinked)),
    ]
}

proptest! {
    /// A policy is demanded exactly when both sides own a customer and no
    /// policy was supplied.
    #[test]
    fn policy_required_iff_double_ownership_without_policy(
        primary in option::of(customer_id()),
        secondary in option::of(customer_id()),
        policy in policy_strategy(),
    ) {
        let resolution = resolve(primary.as_deref(), secondary.as_deref(), policy);
        let deferred = matches!(resolution, BillingResolution::PolicyRequired { .. });
        let expected = primary.is_some() && secondary.is_some() && policy.is_none();
        prop_assert_eq!(deferred, expected);
    }

    /// Whatever survives the merge is one of the two input customer ids.
    #[test]
    fn surviving_customer_comes_from_the_inputs(
        primary in option::of(customer_id()),
        secondary in option::of(customer_id()),
        policy in policy_strategy(),
    ) {
        if let BillingResolution::Resolved { surviving_customer_id: Some(survivor), .. } =
            resolve(primary.as_deref(), secondary.as_deref(), policy)
        {
            prop_assert!(
                primary.as_deref() == Some(survivor.as_str())
                    || secondary.as_deref() == Some(survivor.as_str())
            );
        }
    }

    /// keep_both_unlinked never keeps an automatic association.
    #[test]
    fn keep_both_unlinked_always_clears(
        primary in customer_id(),
        secondary in customer_id(),
    ) {
        let resolution = resolve(
            Some(&primary),
            Some(&secondary),
            Some(ResolutionPolicy::KeepBothUnlinked),
        );
        match resolution {
            BillingResolution::Resolved { surviving_customer_id, orphaned_customer_ids, .. } => {
                prop_assert_eq!(surviving_customer_id, None);
                prop_assert_eq!(orphaned_customer_ids, vec![primary, secondary]);
            }
            BillingResolution::PolicyRequired { .. } => prop_assert!(false, "policy was supplied"),
        }
    }

    /// Every orphaned customer id also came from the inputs.
    #[test]
    fn orphans_come_from_the_inputs(
        primary in option::of(customer_id()),
        secondary in option::of(customer_id()),
        policy in policy_strategy(),
    ) {
        if let BillingResolution::Resolved { orphaned_customer_ids, .. } =
            resolve(primary.as_deref(), secondary.as_deref(), policy)
        {
            for orphan in orphaned_customer_ids {
                prop_assert!(
                    primary.as_deref() == Some(orphan.as_str())
                        || secondary.as_deref() == Some(orphan.as_str())
                );
            }
        }
    }
}

#[cfg(feature = "database")]
proptest! {
    /// Normalization is idempotent over printable ASCII names.
    #[test]
    fn normalization_is_idempotent(name in "[ -~]{0,40}") {
        let once = normalize_name(&name);
        prop_assert_eq!(normalize_name(&once), once.clone());
    }

    /// Case differences never distinguish ASCII names.
    #[test]
    fn normalization_is_case_insensitive(name in "[ -~]{0,40}") {
        prop_assert_eq!(normalize_name(&name.to_uppercase()), normalize_name(&name));
    }
}
