mod validator_set;
pub use validator_set::ValidatorSetVar;

mod transition;
pub use transition::TransitionCircuit;

mod membership;
pub use membership::{
    membership_public_inputs, MembershipCircuit, MembershipMode, MembershipStatement,
};
