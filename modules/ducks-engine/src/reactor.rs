//! Reactor selection.

use crate::traits::Reactor;

/// Reactors in registration order.
pub type Reactors<S, A> = Vec<Box<dyn Reactor<S, A>>>;

/// Pick the corrective action for `state`, if any.
///
/// Reactors are evaluated in order and the scan stops at the first one that
/// returns an action; later reactors are not evaluated.
pub fn run_reactors<S, A>(state: &S, reactors: &[Box<dyn Reactor<S, A>>]) -> Option<A> {
    reactors.iter().find_map(|reactor| reactor.react(state))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn absent(_: &i64) -> Option<&'static str> {
        None
    }

    fn raise_negative(state: &i64) -> Option<&'static str> {
        (*state < 0).then_some("INCREMENT")
    }

    fn always_reset(_: &i64) -> Option<&'static str> {
        Some("RESET")
    }

    fn must_not_run(_: &i64) -> Option<&'static str> {
        panic!("reactor evaluated after a previous one fired")
    }

    #[test]
    fn empty_reactor_list_selects_nothing() {
        let reactors: Reactors<i64, &'static str> = Vec::new();
        assert_eq!(run_reactors(&-5, &reactors), None);
    }

    #[test]
    fn single_present_action_wins_regardless_of_position() {
        let forward: Reactors<i64, &'static str> =
            vec![Box::new(absent), Box::new(raise_negative)];
        let reversed: Reactors<i64, &'static str> =
            vec![Box::new(raise_negative), Box::new(absent)];

        assert_eq!(run_reactors(&-1, &forward), Some("INCREMENT"));
        assert_eq!(run_reactors(&-1, &reversed), Some("INCREMENT"));
    }

    #[test]
    fn first_present_action_short_circuits_the_scan() {
        let reactors: Reactors<i64, &'static str> = vec![
            Box::new(always_reset),
            Box::new(must_not_run),
            Box::new(raise_negative),
        ];
        assert_eq!(run_reactors(&-1, &reactors), Some("RESET"));
    }

    #[test]
    fn no_condition_met_is_a_no_op() {
        let reactors: Reactors<i64, &'static str> =
            vec![Box::new(absent), Box::new(raise_negative)];
        assert_eq!(run_reactors(&3, &reactors), None);
    }
}
