use crate::define_ids;

define_ids! {
    /// A grant of one agent's resources, valid for a single pass.
    OfferId => "offer",
    /// A machine that runs tasks.
    AgentId => "agent",
    PlanId => "plan",
    PhaseId => "phase",
    StepId => "step",
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IdError;

    #[test]
    fn test_display_uses_kind() {
        assert!(OfferId::new().to_string().starts_with("offer_"));
        assert!(StepId::new().to_string().starts_with("step_"));
    }

    #[test]
    fn test_parse_rejects_other_kind() {
        let offer = OfferId::new().to_string();
        let err = offer.parse::<StepId>().unwrap_err();
        assert_eq!(
            err,
            IdError::WrongKind {
                expected: "step",
                found: "offer".to_string()
            }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<AgentId>(), Err(IdError::Empty));
        assert!(matches!(
            "agent01HV4Z2WQXKJNM8GPQY6VBKC3D".parse::<AgentId>(),
            Err(IdError::Malformed(_))
        ));
        assert!(matches!(
            "plan_invalid".parse::<PlanId>(),
            Err(IdError::BadUlid { .. })
        ));
    }

    #[test]
    fn test_ids_sort_by_creation() {
        let ulid = crate::Ulid::from_parts(1, 0);
        let later = crate::Ulid::from_parts(2, 0);
        assert!(PhaseId(ulid) < PhaseId(later));
    }

    #[test]
    fn test_json_is_prefixed_string() {
        let id = PhaseId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
        assert_eq!(serde_json::from_str::<PhaseId>(&json).unwrap(), id);
        assert!(serde_json::from_str::<StepId>(&json).is_err());
    }

    #[test]
    fn test_kinds_are_unique() {
        let kinds = [
            OfferId::KIND,
            AgentId::KIND,
            PlanId::KIND,
            PhaseId::KIND,
            StepId::KIND,
        ];
        let unique: std::collections::HashSet<_> = kinds.iter().collect();
        assert_eq!(kinds.len(), unique.len());
    }
}
