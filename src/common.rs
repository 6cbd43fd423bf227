use rust_decimal::Decimal;

/// Truncates a monetary value to 2 fractional digits.
///
/// Applied after every multiplication/subtraction step so intermediate
/// results never carry more precision than the money columns store.
pub fn to_money(value: Decimal) -> Decimal {
    value.trunc_with_scale(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn truncates_instead_of_rounding() {
        assert_eq!(to_money(dec!(1.999)), dec!(1.99));
        assert_eq!(to_money(dec!(1.991)), dec!(1.99));
        assert_eq!(to_money(dec!(-1.999)), dec!(-1.99));
        assert_eq!(to_money(dec!(10)), dec!(10));
    }
}
