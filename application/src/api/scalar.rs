//! GraphQL scalar definitions.

use std::{fmt, marker::PhantomData, str::FromStr};

use juniper::{
    GraphQLType, InputValue, ParseScalarResult, ParseScalarValue, ScalarToken,
    ScalarValue, Value,
};

/// Adapter of domain types to GraphQL string scalars, used in
/// `#[graphql(with = ..)]` attributes.
///
/// Strings are parsed and printed by the [`FromStr`]/[`Display`] impls of the
/// `As` domain type, which the target type wraps via [`TryFrom`] and
/// [`AsRef`].
///
/// [`Display`]: fmt::Display
#[derive(Debug)]
pub struct Via<As>(PhantomData<As>);

impl<As> Via<As> {
    /// Convert the target type into scalar [`Value`] by using [`Display`] impl
    /// of `As` type.
    ///
    /// [`Display`]: fmt::Display
    pub fn to_output<T, S>(value: &T) -> Value<S>
    where
        As: fmt::Display,
        T: AsRef<As>,
        S: ScalarValue,
    {
        Value::from(value.as_ref().to_string())
    }

    /// Constructs the target type from scalar [`Value`] by using [`FromStr`]
    /// impl of `As` type.
    ///
    /// # Errors
    ///
    /// If the input value is not a string, or is not parsed into `As` type, or
    /// is not converted into the target type.
    pub fn from_input<T, S>(input: &InputValue<S>) -> Result<T, String>
    where
        As: FromStr,
        As::Err: fmt::Display,
        T: TryFrom<As> + GraphQLType<S, TypeInfo = ()>,
        T::Error: fmt::Display,
        S: ScalarValue,
    {
        let name = T::name(&()).unwrap_or("<anonymous>");
        let fail = |reason: String| {
            format!("Cannot parse input scalar `{name}`: {reason}")
        };

        let s = input.as_string_value().ok_or_else(|| {
            fail(format!("expected string input value, found: {input}"))
        })?;
        let parsed = s
            .parse::<As>()
            .map_err(|e| fail(format!("invalid \"{s}\" string: {e}")))?;
        T::try_from(parsed).map_err(|e| fail(e.to_string()))
    }

    /// Parse the provided [`ScalarToken`].
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be parsed as [`String`].
    pub fn parse_token<S: ScalarValue>(
        value: ScalarToken<'_>,
    ) -> ParseScalarResult<S> {
        <String as ParseScalarValue<S>>::from_str(value)
    }
}

#[cfg(test)]
mod spec {
    use juniper::{DefaultScalarValue, InputValue};
    use service::domain::reservation;

    use crate::api;

    use super::Via;

    fn code(input: &InputValue) -> Result<api::reservation::Code, String> {
        Via::<reservation::Code>::from_input::<_, DefaultScalarValue>(input)
    }

    #[test]
    fn parses_string_input() {
        let parsed = code(&InputValue::scalar("RSV-7Q2M9XKD")).unwrap();

        assert_eq!(parsed.to_string(), "RSV-7Q2M9XKD");
    }

    #[test]
    fn names_scalar_in_errors() {
        let err = code(&InputValue::scalar("RSV-0")).unwrap_err();
        assert!(
            err.starts_with("Cannot parse input scalar `ReservationCode`"),
            "{err}",
        );
        assert!(err.contains("\"RSV-0\""), "{err}");

        let err = code(&InputValue::scalar(42)).unwrap_err();
        assert!(err.contains("expected string input value"), "{err}");
    }
}
