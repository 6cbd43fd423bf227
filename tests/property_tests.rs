use mercantil_api::common::to_money;
use mercantil_api::entities::sale::compute_total;
use mercantil_api::entities::sale_item::line_total;
use proptest::prelude::*;
use rust_decimal::Decimal;

/// A money amount expressed in integer cents, so every input already has
/// exactly 2 fractional digits.
fn cents(value: i64) -> Decimal {
    Decimal::new(value, 2)
}

proptest! {
    // With 2-decimal inputs the truncation steps are exact, so the line
    // total must match plain integer-cent arithmetic.
    #[test]
    fn line_total_matches_integer_cents(
        price_cents in 1i64..100_000,
        quantity in 1i32..10_000,
        discount_cents in 0i64..50_000,
    ) {
        let expected = cents(price_cents * i64::from(quantity) - discount_cents);
        prop_assert_eq!(
            line_total(cents(price_cents), quantity, cents(discount_cents)),
            expected
        );
    }

    // sale.total == subtotal - discount + tax for any 2-decimal inputs.
    #[test]
    fn sale_total_matches_formula(
        item_totals in prop::collection::vec(0i64..1_000_000, 0..12),
        discount_cents in 0i64..100_000,
        tax_cents in 0i64..100_000,
    ) {
        let subtotal_cents: i64 = item_totals.iter().sum();
        let subtotal = cents(subtotal_cents);
        let expected = cents(subtotal_cents - discount_cents + tax_cents);
        prop_assert_eq!(
            compute_total(subtotal, cents(discount_cents), cents(tax_cents)),
            expected
        );
    }

    // Truncation never increases magnitude and always lands on 2 digits.
    #[test]
    fn money_truncation_is_contractive(mantissa in -1_000_000_000i64..1_000_000_000, scale in 0u32..9) {
        let value = Decimal::new(mantissa, scale);
        let truncated = to_money(value);
        prop_assert!(truncated.scale() <= 2);
        prop_assert!(truncated.abs() <= value.abs());
    }
}
