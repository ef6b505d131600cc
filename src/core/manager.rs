//! Apply/remove orchestration
//!
//! Each (descriptor, family) pair is either installed or not. Applying
//! compiles the rule for every selected family and adds only the ones the
//! engine does not already have; removing does the reverse for every target
//! the rule could have been created with.
//!
//! Families are processed one after another with no rollback: when the
//! second family fails, the first stays applied and the error is returned.

use tracing::{debug, info};

use crate::core::compiler::compile;
use crate::core::error::{Error, Result};
use crate::core::family::{AddressFamily, select_families};
use crate::core::idempotency::IdempotencyChecker;
use crate::core::rule::{ActionKind, RuleDescriptor};
use crate::core::store::FirewallRuleStore;
use crate::executor::CommandExecutor;

/// What one apply or remove call did to the engine
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvergeReport {
    /// Rules added by this call
    pub added: Vec<String>,
    /// Rules removed by this call
    pub removed: Vec<String>,
    /// Rules already in the desired state
    pub unchanged: Vec<String>,
}

impl ConvergeReport {
    /// True when at least one mutation was issued
    pub fn updated(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }
}

/// One compiled rule as it would be sent to the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedRule {
    pub action: ActionKind,
    pub family: AddressFamily,
    pub rule: String,
}

/// Compiles a descriptor for every selected family without touching the engine.
///
/// For `Remove` the plan lists each candidate of the removal sweep.
///
/// # Errors
///
/// Returns the validation error, or the selection or compilation error of the
/// first failing family.
pub fn preview(action: ActionKind, descriptor: &RuleDescriptor) -> Result<Vec<PlannedRule>> {
    descriptor.validate()?;
    let families = select_families(descriptor)?;
    let actions: &[ActionKind] = if action == ActionKind::Remove {
        &ActionKind::REMOVAL_SWEEP
    } else {
        std::slice::from_ref(&action)
    };

    let mut plan = Vec::new();
    for &candidate in actions {
        if action == ActionKind::Remove && skip_in_sweep(candidate, descriptor) {
            continue;
        }
        for &family in &families {
            plan.push(PlannedRule {
                action: candidate,
                family,
                rule: compile(descriptor, candidate, family)?,
            });
        }
    }
    Ok(plan)
}

/// A redirect without a port cannot have been applied, so it is not swept.
fn skip_in_sweep(action: ActionKind, descriptor: &RuleDescriptor) -> bool {
    action == ActionKind::Redirect && descriptor.raw.is_none() && descriptor.redirect_port.is_none()
}

/// Converges the engine towards a descriptor
#[derive(Debug)]
pub struct RuleStateManager<E> {
    store: FirewallRuleStore<E>,
}

impl<E: CommandExecutor> RuleStateManager<E> {
    pub fn new(store: FirewallRuleStore<E>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &FirewallRuleStore<E> {
        &self.store
    }

    /// Dispatches `Remove` to [`Self::remove`] and every other action to [`Self::apply`].
    ///
    /// # Errors
    ///
    /// See [`Self::apply`] and [`Self::remove`].
    pub fn run(&self, action: ActionKind, descriptor: &RuleDescriptor) -> Result<ConvergeReport> {
        let mut report = ConvergeReport::default();
        self.run_into(action, descriptor, &mut report)?;
        Ok(report)
    }

    /// Like [`Self::run`], recording into `report` as it goes.
    ///
    /// When a later family or sweep candidate fails, `report` still lists the
    /// mutations issued before the failure.
    ///
    /// # Errors
    ///
    /// See [`Self::apply`] and [`Self::remove`].
    pub fn run_into(
        &self,
        action: ActionKind,
        descriptor: &RuleDescriptor,
        report: &mut ConvergeReport,
    ) -> Result<()> {
        match action {
            ActionKind::Remove => self.remove_into(descriptor, report),
            _ => self.apply_into(action, descriptor, report),
        }
    }

    /// Installs the rule for every selected family that does not have it yet.
    ///
    /// # Errors
    ///
    /// - `Error::Validation` when the descriptor fails [`RuleDescriptor::validate`]
    /// - `Error::InvalidArgument` for `Remove` or a redirect without port
    /// - `Error::InvalidAddress` for an unparsable source/destination
    /// - `Error::CommandFailed` when the engine rejects an add; families
    ///   already applied stay applied
    pub fn apply(&self, action: ActionKind, descriptor: &RuleDescriptor) -> Result<ConvergeReport> {
        let mut report = ConvergeReport::default();
        self.apply_into(action, descriptor, &mut report)?;
        Ok(report)
    }

    fn apply_into(
        &self,
        action: ActionKind,
        descriptor: &RuleDescriptor,
        report: &mut ConvergeReport,
    ) -> Result<()> {
        if action == ActionKind::Remove {
            return Err(Error::InvalidArgument(
                "remove is not an apply action".to_string(),
            ));
        }
        descriptor.validate()?;

        let name = descriptor.display_name();

        for family in select_families(descriptor)? {
            let rule = compile(descriptor, action, family)?;
            debug!("{name}: {rule}");

            if self.store.exists(&rule)? {
                info!("{name} {action} rule exists... won't apply");
                report.unchanged.push(rule);
            } else {
                self.store.add_rule(&rule)?;
                info!("{name} {action} rule applied ({family})");
                report.added.push(rule);
            }
        }

        Ok(())
    }

    /// Removes the rule for every target it may have been created with.
    ///
    /// The target used at creation is not recorded, so allow, deny, reject,
    /// redirect and masquerade variants are each checked and removed in that
    /// order. Log rules are left alone.
    ///
    /// # Errors
    ///
    /// - `Error::Validation` when the descriptor fails [`RuleDescriptor::validate`]
    /// - `Error::InvalidAddress` for an unparsable source/destination
    /// - `Error::CommandFailed` when the engine refuses a removal; variants
    ///   already removed stay removed
    pub fn remove(&self, descriptor: &RuleDescriptor) -> Result<ConvergeReport> {
        let mut report = ConvergeReport::default();
        self.remove_into(descriptor, &mut report)?;
        Ok(report)
    }

    fn remove_into(&self, descriptor: &RuleDescriptor, report: &mut ConvergeReport) -> Result<()> {
        descriptor.validate()?;

        let name = descriptor.display_name();
        let families = select_families(descriptor)?;

        for action in ActionKind::REMOVAL_SWEEP {
            if skip_in_sweep(action, descriptor) {
                debug!("{name} has no redirect_port, skipping redirect variant");
                continue;
            }

            for &family in &families {
                let rule = compile(descriptor, action, family)?;
                debug!("{name}: {rule}");

                if self.store.exists(&rule)? {
                    self.store.remove_rule(&rule)?;
                    info!("{name} {action} rule removed ({family})");
                    report.removed.push(rule);
                } else {
                    info!("{name} {action} rule does not exist... won't remove");
                    report.unchanged.push(rule);
                }
            }
        }

        Ok(())
    }
}
