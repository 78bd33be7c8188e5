use lattice_objects::{Payload, StoredObject};

/// Select what a caller may see of a produced or cached result.
///
/// `readable` is whether the caller holds read access to the result's
/// identifier. Twins resolve to their private half only for readers and
/// degrade to the mock, then to an empty placeholder. Failures are always
/// visible, since by convention they carry no private content. A value that
/// is itself a mock is visible as-is.
pub fn resolve_visibility(object: &StoredObject, readable: bool) -> Payload {
    match object {
        StoredObject::Twin { private, mock } => {
            if readable {
                private.clone()
            } else if !mock.is_empty() {
                mock.clone()
            } else {
                private.as_empty()
            }
        }
        StoredObject::Plain {
            payload: payload @ Payload::Failure(_),
            ..
        } => payload.clone(),
        StoredObject::Plain { payload, mock: true } => payload.clone(),
        StoredObject::Plain { payload, mock: false } => {
            if readable {
                payload.clone()
            } else {
                payload.as_empty()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use lattice_objects::{Payload, StoredObject, Value, ValueKind};

    use super::resolve_visibility;

    #[test]
    fn it_resolves_twins_by_readability() {
        let twin = StoredObject::twin(
            Value::String("secret".into()),
            Value::String("mock".into()),
        );

        assert_eq!(
            resolve_visibility(&twin, true),
            Payload::Data(Value::String("secret".into()))
        );
        assert_eq!(
            resolve_visibility(&twin, false),
            Payload::Data(Value::String("mock".into()))
        );
    }

    #[test]
    fn it_degrades_mockless_twins_to_empty_placeholders() {
        let twin = StoredObject::Twin {
            private: Payload::Data(Value::UnsignedInt(42)),
            mock: Payload::Empty(ValueKind::UnsignedInt),
        };

        assert_eq!(
            resolve_visibility(&twin, false),
            Payload::Empty(ValueKind::UnsignedInt)
        );
    }

    #[test]
    fn it_always_shows_failures() {
        let failure = StoredObject::plain(Payload::Failure("division by zero".into()));

        assert_eq!(
            resolve_visibility(&failure, false),
            Payload::Failure("division by zero".into())
        );
    }

    #[test]
    fn it_shows_mock_values_unchanged() {
        let mock = StoredObject::mock(Value::Boolean(false));

        assert_eq!(
            resolve_visibility(&mock, false),
            Payload::Data(Value::Boolean(false))
        );
    }

    #[test]
    fn it_withholds_plain_values_from_non_readers() {
        let plain = StoredObject::plain(Value::List(vec![Value::UnsignedInt(1)]));

        assert_eq!(
            resolve_visibility(&plain, true),
            Payload::Data(Value::List(vec![Value::UnsignedInt(1)]))
        );
        assert_eq!(
            resolve_visibility(&plain, false),
            Payload::Empty(ValueKind::List)
        );
    }
}
