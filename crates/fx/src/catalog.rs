//! Static currency reference data.

use engine::Currency;
use serde::Serialize;

/// Display data for a well-known currency.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CurrencyInfo {
    pub code: &'static str,
    pub name: &'static str,
    pub symbol: &'static str,
    pub region: &'static str,
    pub decimal_places: u32,
}

/// Codes grouped the way they are offered to merchants.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct CurrencyGroup {
    pub name: &'static str,
    pub codes: &'static [&'static str],
}

const fn info(
    code: &'static str,
    name: &'static str,
    symbol: &'static str,
    region: &'static str,
    decimal_places: u32,
) -> CurrencyInfo {
    CurrencyInfo {
        code,
        name,
        symbol,
        region,
        decimal_places,
    }
}

static INFO: &[CurrencyInfo] = &[
    info("USD", "US Dollar", "$", "United States", 2),
    info("EUR", "Euro", "€", "European Union", 2),
    info("GBP", "British Pound", "£", "United Kingdom", 2),
    info("JPY", "Japanese Yen", "¥", "Japan", 0),
    info("CHF", "Swiss Franc", "CHF", "Switzerland", 2),
    info("CAD", "Canadian Dollar", "C$", "Canada", 2),
    info("AUD", "Australian Dollar", "A$", "Australia", 2),
    info("NZD", "New Zealand Dollar", "NZ$", "New Zealand", 2),
    info("CNY", "Chinese Yuan", "¥", "China", 2),
    info("INR", "Indian Rupee", "₹", "India", 2),
    info("BRL", "Brazilian Real", "R$", "Brazil", 2),
    info("MXN", "Mexican Peso", "$", "Mexico", 2),
    info("KRW", "South Korean Won", "₩", "South Korea", 0),
    info("SGD", "Singapore Dollar", "S$", "Singapore", 2),
    info("HKD", "Hong Kong Dollar", "HK$", "Hong Kong", 2),
    info("ZAR", "South African Rand", "R", "South Africa", 2),
    info("EGP", "Egyptian Pound", "£", "Egypt", 2),
    info("NGN", "Nigerian Naira", "₦", "Nigeria", 2),
    info("KES", "Kenyan Shilling", "KSh", "Kenya", 2),
    info("ETB", "Ethiopian Birr", "Br", "Ethiopia", 2),
    info("AED", "UAE Dirham", "د.إ", "United Arab Emirates", 2),
    info("SAR", "Saudi Riyal", "﷼", "Saudi Arabia", 2),
    info("KWD", "Kuwaiti Dinar", "KD", "Kuwait", 3),
    info("TRY", "Turkish Lira", "₺", "Turkey", 2),
    info("RUB", "Russian Ruble", "₽", "Russia", 2),
    info("PLN", "Polish Złoty", "zł", "Poland", 2),
];

static GROUPS: &[CurrencyGroup] = &[
    CurrencyGroup {
        name: "major",
        codes: &["USD", "EUR", "GBP", "JPY", "CHF", "CAD", "AUD", "NZD"],
    },
    CurrencyGroup {
        name: "emerging",
        codes: &[
            "CNY", "INR", "BRL", "MXN", "KRW", "SGD", "HKD", "NOK", "SEK", "DKK",
        ],
    },
    CurrencyGroup {
        name: "african",
        codes: &["ZAR", "EGP", "NGN", "KES", "GHS", "ETB", "MAD", "TND", "DZD"],
    },
    CurrencyGroup {
        name: "middle_eastern",
        codes: &["AED", "SAR", "QAR", "KWD", "BHD", "OMR", "JOD", "ILS", "TRY"],
    },
    CurrencyGroup {
        name: "other",
        codes: &["RUB", "PLN", "CZK", "HUF", "RON", "BGN", "RSD", "UAH"],
    },
];

pub fn supported_currencies() -> &'static [CurrencyGroup] {
    GROUPS
}

pub fn is_supported(currency: Currency) -> bool {
    GROUPS
        .iter()
        .any(|group| group.codes.contains(&currency.code()))
}

/// Reference data for `currency`, `None` for codes outside the table.
pub fn currency_info(currency: Currency) -> Option<CurrencyInfo> {
    INFO.iter().find(|info| info.code == currency.code()).copied()
}
