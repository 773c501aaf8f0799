use nucleo_core::currency::{
    format_amount, minor_units_for, parse_amount, symbol_for, CurrencyCode, LocaleConfig,
};

#[test]
fn formats_brazilian_real_amounts() {
    let code = CurrencyCode::new("brl");
    let locale = LocaleConfig::pt_br();
    assert_eq!(format_amount(1234.56, &code, &locale, false), "R$ 1.234,56");
    assert_eq!(format_amount(-85.0, &code, &locale, false), "-R$ 85,00");
    assert_eq!(format_amount(500.0, &code, &locale, true), "+R$ 500,00");
    assert_eq!(format_amount(-120.0, &code, &locale, true), "-R$ 120,00");
}

#[test]
fn formats_dollars_with_us_separators() {
    let code = CurrencyCode::new("USD");
    let locale = LocaleConfig::en_us();
    assert_eq!(format_amount(1234567.5, &code, &locale, false), "$ 1,234,567.50");
}

#[test]
fn zero_decimal_currencies_round_to_whole_units() {
    let code = CurrencyCode::new("JPY");
    assert_eq!(minor_units_for(code.as_str()), 0);
    assert_eq!(
        format_amount(1500.4, &code, &LocaleConfig::en_us(), false),
        format!("{} 1,500", symbol_for("JPY"))
    );
}

#[test]
fn parses_amounts_as_typed_in_each_locale() {
    let br = LocaleConfig::pt_br();
    assert_eq!(parse_amount("R$ 1.234,56", &br), Some(1234.56));
    assert_eq!(parse_amount("85", &br), Some(85.0));
    assert_eq!(parse_amount("0,5", &br), Some(0.5));

    let us = LocaleConfig::en_us();
    assert_eq!(parse_amount("$1,234.56", &us), Some(1234.56));
    assert_eq!(parse_amount("-20.25", &us), Some(-20.25));
    assert_eq!(parse_amount("twelve", &us), None);
}

#[test]
fn formatted_amounts_parse_back() {
    let code = CurrencyCode::default();
    let locale = LocaleConfig::pt_br();
    let text = format_amount(-9876.54, &code, &locale, false);
    assert_eq!(parse_amount(&text, &locale), Some(-9876.54));
}
