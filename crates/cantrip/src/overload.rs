use std::cmp::Ordering;

use crate::{
    conversion::{Conversion, ConversionPolicy},
    function::Function,
    types::Type,
    typesystem::TypeSystem,
};

/// Outcome of overload resolution. Like conversion computation, this
/// never errors: callers decide whether a missing candidate is fatal.
pub enum OverloadResult {
    Selected {
        function: Function,
        conversions: Vec<Conversion>,
    },
    NoMatch,
    Ambiguous,
}

impl OverloadResult {
    #[must_use]
    pub fn selected(self) -> Option<(Function, Vec<Conversion>)> {
        match self {
            Self::Selected { function, conversions } => Some((function, conversions)),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Self::Ambiguous)
    }
}

struct Viable {
    function: Function,
    conversions: Vec<Conversion>,
}

/// A candidate is viable when its arity fits (missing tail parameters
/// must be covered by default arguments) and every provided argument
/// converts to the corresponding parameter.
fn viability(candidate: &Function, arg_types: &[Type], ts: &TypeSystem, policy: ConversionPolicy) -> Option<Viable> {
    let param_count = candidate.parameter_count();
    let n = arg_types.len();
    if n > param_count {
        return None;
    }
    if n < param_count && candidate.default_argument_count() < param_count - n {
        return None;
    }

    let mut conversions = Vec::with_capacity(n);
    for (i, arg) in arg_types.iter().enumerate() {
        let param = candidate.parameter(i)?;
        let conv = Conversion::compute(*arg, param, ts, policy);
        if conv.is_invalid() {
            return None;
        }
        conversions.push(conv);
    }
    Some(Viable {
        function: candidate.clone(),
        conversions,
    })
}

/// `a` is a better candidate than `b` when no argument conversion is
/// worse and at least one is strictly better.
fn better_than(a: &Viable, b: &Viable) -> bool {
    let mut strictly_better = false;
    for (ca, cb) in a.conversions.iter().zip(b.conversions.iter()) {
        match Conversion::comp(ca, cb) {
            Ordering::Less => strictly_better = true,
            Ordering::Greater => return false,
            Ordering::Equal => {}
        }
    }
    strictly_better
}

/// Selects the unique best candidate for the argument types.
#[must_use]
pub fn resolve(candidates: &[Function], arg_types: &[Type], ts: &TypeSystem, policy: ConversionPolicy) -> OverloadResult {
    let mut viable: Vec<Viable> = candidates
        .iter()
        .filter_map(|c| viability(c, arg_types, ts, policy))
        .collect();

    match viable.len() {
        0 => OverloadResult::NoMatch,
        1 => {
            let v = viable.pop().expect("len checked");
            OverloadResult::Selected {
                function: v.function,
                conversions: v.conversions,
            }
        }
        _ => {
            let mut best = 0;
            for i in 1..viable.len() {
                if better_than(&viable[i], &viable[best]) {
                    best = i;
                }
            }
            let unique = (0..viable.len()).all(|i| i == best || better_than(&viable[best], &viable[i]));
            if !unique {
                return OverloadResult::Ambiguous;
            }
            let v = viable.swap_remove(best);
            OverloadResult::Selected {
                function: v.function,
                conversions: v.conversions,
            }
        }
    }
}
