//! Built-in, categorically forbidden action classes (spec §4.G step 3):
//! identity-fusion / "hive" operations that no capability grant can
//! re-enable. The list is fixed in source, not configurable, because the
//! whole point is that a compromised genome cannot re-permit it.

pub struct ForbiddenClass {
    pub action_id: &'static str,
    pub reason: &'static str,
    pub alternative: &'static str,
}

pub const FORBIDDEN_CLASSES: &[ForbiddenClass] = &[
    ForbiddenClass {
        action_id: "identity.fuse",
        reason: "action merges actor identity boundaries, which is categorically prohibited",
        alternative: "perform the two actions separately, each under its own actor identity",
    },
    ForbiddenClass {
        action_id: "hive.merge",
        reason: "action collapses multiple actors into a shared decision boundary, which is categorically prohibited",
        alternative: "coordinate the actors through separate governed actions instead of a merged identity",
    },
    ForbiddenClass {
        action_id: "collective.assimilate",
        reason: "action absorbs another actor's state into this actor's boundary, which is categorically prohibited",
        alternative: "request the specific data needed through a scoped read action",
    },
];

pub fn lookup(action_id: &str) -> Option<&'static ForbiddenClass> {
    FORBIDDEN_CLASSES.iter().find(|c| c.action_id == action_id)
}
