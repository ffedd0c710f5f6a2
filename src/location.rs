//! Built-in location catalog
//!
//! Major cities of the countries the display is commonly installed in, each
//! with coordinates, an IANA timezone and the country's customary
//! calculation method. Lookups ignore case, spacing and punctuation and also
//! accept the Arabic names. The first city of each country is its capital and
//! is used when only a country is given.

use chrono_tz::Tz;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::PrayerError;
use crate::method::CalculationMethod;
use crate::types::Coordinates;

/// One catalog city
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct City {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: &'static str,
}

/// One catalog country; `cities[0]` is the capital
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Country {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub method: CalculationMethod,
    pub cities: &'static [City],
}

/// A location ready for the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub country: String,
    pub city: String,
    pub coordinates: Coordinates,
    pub timezone: Tz,
    pub method: CalculationMethod,
}

const fn city(
    name: &'static str,
    aliases: &'static [&'static str],
    latitude: f64,
    longitude: f64,
    timezone: &'static str,
) -> City {
    City {
        name,
        aliases,
        latitude,
        longitude,
        timezone,
    }
}

static CATALOG: &[Country] = &[
    Country {
        name: "Jordan",
        aliases: &["الأردن"],
        method: CalculationMethod::Jordan,
        cities: &[
            city("Amman", &["عمان"], 31.9539, 35.9106, "Asia/Amman"),
            city("Zarqa", &["الزرقاء"], 32.0728, 36.0880, "Asia/Amman"),
            city("Irbid", &["إربد"], 32.5556, 35.8500, "Asia/Amman"),
            city("Aqaba", &["العقبة"], 29.5321, 35.0063, "Asia/Amman"),
            city("As Salt", &["Salt", "السلط"], 32.0392, 35.7272, "Asia/Amman"),
            city("Madaba", &["مأدبا"], 31.7160, 35.7939, "Asia/Amman"),
        ],
    },
    Country {
        name: "Saudi Arabia",
        aliases: &["KSA", "Saudi", "السعودية"],
        method: CalculationMethod::UmmAlQura,
        cities: &[
            city("Riyadh", &["الرياض"], 24.7136, 46.6753, "Asia/Riyadh"),
            city("Jeddah", &["Jiddah", "جدة"], 21.4858, 39.1925, "Asia/Riyadh"),
            city("Makkah", &["Mecca", "مكة المكرمة"], 21.4225, 39.8262, "Asia/Riyadh"),
            city("Madinah", &["Medina", "المدينة المنورة"], 24.5247, 39.5692, "Asia/Riyadh"),
            city("Dammam", &["الدمام"], 26.4207, 50.0888, "Asia/Riyadh"),
            city("Khobar", &["Al Khobar", "الخبر"], 26.2172, 50.1971, "Asia/Riyadh"),
        ],
    },
    Country {
        name: "Egypt",
        aliases: &["مصر"],
        method: CalculationMethod::Egyptian,
        cities: &[
            city("Cairo", &["القاهرة"], 30.0444, 31.2357, "Africa/Cairo"),
            city("Alexandria", &["الإسكندرية"], 31.2001, 29.9187, "Africa/Cairo"),
            city("Giza", &["الجيزة"], 30.0131, 31.2089, "Africa/Cairo"),
            city("Shubra El Kheima", &["شبرا الخيمة"], 30.1286, 31.2422, "Africa/Cairo"),
            city("Port Said", &["بور سعيد"], 31.2653, 32.3019, "Africa/Cairo"),
            city("Suez", &["السويس"], 29.9668, 32.5498, "Africa/Cairo"),
        ],
    },
    Country {
        name: "United Arab Emirates",
        aliases: &["UAE", "Emirates", "الإمارات العربية المتحدة"],
        method: CalculationMethod::Dubai,
        cities: &[
            city("Abu Dhabi", &["أبو ظبي"], 24.4539, 54.3773, "Asia/Dubai"),
            city("Dubai", &["دبي"], 25.2048, 55.2708, "Asia/Dubai"),
            city("Sharjah", &["الشارقة"], 25.3463, 55.4209, "Asia/Dubai"),
            city("Al Ain", &["العين"], 24.2075, 55.7447, "Asia/Dubai"),
            city("Ajman", &["عجمان"], 25.4052, 55.5136, "Asia/Dubai"),
        ],
    },
    Country {
        name: "Qatar",
        aliases: &["قطر"],
        method: CalculationMethod::Qatar,
        cities: &[
            city("Doha", &["الدوحة"], 25.2854, 51.5310, "Asia/Qatar"),
            city("Al Wakrah", &["الوكرة"], 25.1659, 51.6034, "Asia/Qatar"),
            city("Al Rayyan", &["الريان"], 25.2919, 51.4244, "Asia/Qatar"),
        ],
    },
    Country {
        name: "Bahrain",
        aliases: &["البحرين"],
        method: CalculationMethod::UmmAlQura,
        cities: &[
            city("Manama", &["المنامة"], 26.2285, 50.5860, "Asia/Bahrain"),
            city("Riffa", &["الرفاع"], 26.1300, 50.5550, "Asia/Bahrain"),
            city("Muharraq", &["المحرق"], 26.2572, 50.6119, "Asia/Bahrain"),
        ],
    },
    Country {
        name: "Kuwait",
        aliases: &["الكويت"],
        method: CalculationMethod::Kuwait,
        cities: &[
            city("Kuwait City", &["Kuwait", "مدينة الكويت"], 29.3759, 47.9774, "Asia/Kuwait"),
            city("Hawalli", &["حولي"], 29.3328, 48.0286, "Asia/Kuwait"),
            city("Salmiya", &["السالمية"], 29.3339, 48.0761, "Asia/Kuwait"),
        ],
    },
    Country {
        name: "Oman",
        aliases: &["عُمان"],
        method: CalculationMethod::MuslimWorldLeague,
        cities: &[
            city("Muscat", &["مسقط"], 23.5880, 58.3829, "Asia/Muscat"),
            city("Salalah", &["صلالة"], 17.0151, 54.0924, "Asia/Muscat"),
            city("Sohar", &["صحار"], 24.3470, 56.7094, "Asia/Muscat"),
        ],
    },
    Country {
        name: "Iraq",
        aliases: &["العراق"],
        method: CalculationMethod::MuslimWorldLeague,
        cities: &[
            city("Baghdad", &["بغداد"], 33.3152, 44.3661, "Asia/Baghdad"),
            city("Mosul", &["الموصل"], 36.3489, 43.1577, "Asia/Baghdad"),
            city("Basra", &["البصرة"], 30.5085, 47.7804, "Asia/Baghdad"),
            city("Erbil", &["أربيل"], 36.1911, 44.0092, "Asia/Baghdad"),
        ],
    },
    Country {
        name: "Syria",
        aliases: &["سوريا"],
        method: CalculationMethod::Egyptian,
        cities: &[
            city("Damascus", &["دمشق"], 33.5138, 36.2765, "Asia/Damascus"),
            city("Aleppo", &["حلب"], 36.2021, 37.1343, "Asia/Damascus"),
            city("Homs", &["حمص"], 34.7324, 36.7137, "Asia/Damascus"),
        ],
    },
    Country {
        name: "Lebanon",
        aliases: &["لبنان"],
        method: CalculationMethod::MuslimWorldLeague,
        cities: &[
            city("Beirut", &["بيروت"], 33.8938, 35.5018, "Asia/Beirut"),
            city("Tripoli", &["طرابلس"], 34.4367, 35.8497, "Asia/Beirut"),
            city("Sidon", &["Saida", "صيدا"], 33.5571, 35.3729, "Asia/Beirut"),
        ],
    },
    Country {
        name: "Palestine",
        aliases: &["فلسطين"],
        method: CalculationMethod::MuslimWorldLeague,
        cities: &[
            city("Jerusalem", &["Al Quds", "القدس"], 31.7683, 35.2137, "Asia/Jerusalem"),
            city("Gaza", &["غزة"], 31.5017, 34.4668, "Asia/Gaza"),
            city("Ramallah", &["رام الله"], 31.9038, 35.2034, "Asia/Hebron"),
            city("Hebron", &["Al Khalil", "الخليل"], 31.5326, 35.0998, "Asia/Hebron"),
            city("Nablus", &["نابلس"], 32.2211, 35.2544, "Asia/Hebron"),
        ],
    },
    Country {
        name: "Yemen",
        aliases: &["اليمن"],
        method: CalculationMethod::MuslimWorldLeague,
        cities: &[
            city("Sanaa", &["صنعاء"], 15.3694, 44.1910, "Asia/Aden"),
            city("Aden", &["عدن"], 12.7855, 45.0187, "Asia/Aden"),
            city("Taiz", &["تعز"], 13.5795, 44.0209, "Asia/Aden"),
        ],
    },
    Country {
        name: "Libya",
        aliases: &["ليبيا"],
        method: CalculationMethod::Egyptian,
        cities: &[
            city("Tripoli", &["طرابلس"], 32.8872, 13.1913, "Africa/Tripoli"),
            city("Benghazi", &["بنغازي"], 32.1167, 20.0667, "Africa/Tripoli"),
            city("Misrata", &["مصراتة"], 32.3754, 15.0925, "Africa/Tripoli"),
        ],
    },
    Country {
        name: "Tunisia",
        aliases: &["تونس"],
        method: CalculationMethod::MuslimWorldLeague,
        cities: &[
            city("Tunis", &["تونس"], 36.8065, 10.1815, "Africa/Tunis"),
            city("Sfax", &["صفاقس"], 34.7406, 10.7603, "Africa/Tunis"),
            city("Sousse", &["سوسة"], 35.8256, 10.6369, "Africa/Tunis"),
        ],
    },
    Country {
        name: "Algeria",
        aliases: &["الجزائر"],
        method: CalculationMethod::MuslimWorldLeague,
        cities: &[
            city("Algiers", &["الجزائر العاصمة"], 36.7538, 3.0588, "Africa/Algiers"),
            city("Oran", &["وهران"], 35.6971, -0.6308, "Africa/Algiers"),
            city("Constantine", &["قسنطينة"], 36.3650, 6.6147, "Africa/Algiers"),
        ],
    },
    Country {
        name: "Morocco",
        aliases: &["المغرب"],
        method: CalculationMethod::MuslimWorldLeague,
        cities: &[
            city("Rabat", &["الرباط"], 34.0209, -6.8416, "Africa/Casablanca"),
            city("Casablanca", &["الدار البيضاء"], 33.5731, -7.5898, "Africa/Casablanca"),
            city("Fez", &["Fes", "فاس"], 34.0181, -5.0078, "Africa/Casablanca"),
            city("Marrakesh", &["Marrakech", "مراكش"], 31.6295, -7.9811, "Africa/Casablanca"),
        ],
    },
    Country {
        name: "Sudan",
        aliases: &["السودان"],
        method: CalculationMethod::Egyptian,
        cities: &[
            city("Khartoum", &["الخرطوم"], 15.5007, 32.5599, "Africa/Khartoum"),
            city("Omdurman", &["أم درمان"], 15.6445, 32.4777, "Africa/Khartoum"),
        ],
    },
    Country {
        name: "Turkey",
        aliases: &["Turkiye", "تركيا"],
        method: CalculationMethod::MuslimWorldLeague,
        cities: &[
            city("Ankara", &["أنقرة"], 39.9334, 32.8597, "Europe/Istanbul"),
            city("Istanbul", &["اسطنبول"], 41.0082, 28.9784, "Europe/Istanbul"),
            city("Izmir", &["إزمير"], 38.4237, 27.1428, "Europe/Istanbul"),
            city("Bursa", &["بورصة"], 40.1885, 29.0610, "Europe/Istanbul"),
            city("Konya", &["قونية"], 37.8746, 32.4932, "Europe/Istanbul"),
        ],
    },
    Country {
        name: "Pakistan",
        aliases: &["باكستان"],
        method: CalculationMethod::Karachi,
        cities: &[
            city("Islamabad", &["إسلام آباد"], 33.6844, 73.0479, "Asia/Karachi"),
            city("Karachi", &["كراتشي"], 24.8607, 67.0011, "Asia/Karachi"),
            city("Lahore", &["لاهور"], 31.5204, 74.3587, "Asia/Karachi"),
            city("Faisalabad", &["فيصل آباد"], 31.4504, 73.1350, "Asia/Karachi"),
        ],
    },
    Country {
        name: "Indonesia",
        aliases: &["إندونيسيا"],
        method: CalculationMethod::Singapore,
        cities: &[
            city("Jakarta", &["جاكرتا"], -6.2088, 106.8456, "Asia/Jakarta"),
            city("Surabaya", &["سورابايا"], -7.2575, 112.7521, "Asia/Jakarta"),
            city("Bandung", &["باندونغ"], -6.9175, 107.6191, "Asia/Jakarta"),
        ],
    },
    Country {
        name: "Malaysia",
        aliases: &["ماليزيا"],
        method: CalculationMethod::Singapore,
        cities: &[
            city("Kuala Lumpur", &["كوالالمبور"], 3.1390, 101.6869, "Asia/Kuala_Lumpur"),
            city("George Town", &["Penang", "جورج تاون"], 5.4141, 100.3288, "Asia/Kuala_Lumpur"),
            city("Johor Bahru", &["جوهور باهرو"], 1.4927, 103.7414, "Asia/Kuala_Lumpur"),
        ],
    },
    Country {
        name: "Singapore",
        aliases: &["سنغافورة"],
        method: CalculationMethod::Singapore,
        cities: &[city("Singapore", &["سنغافورة"], 1.3521, 103.8198, "Asia/Singapore")],
    },
];

/// The whole catalog
pub fn countries() -> &'static [Country] {
    CATALOG
}

/// Case, spacing and punctuation insensitive key
fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn matches(query: &str, name: &str, aliases: &[&str]) -> bool {
    normalize(name) == query || aliases.iter().any(|a| normalize(a) == query)
}

impl Country {
    pub fn capital(&self) -> &City {
        &self.cities[0]
    }

    pub fn city(&self, name: &str) -> Option<&City> {
        let query = normalize(name);
        self.cities
            .iter()
            .find(|c| matches(&query, c.name, c.aliases))
    }
}

impl City {
    pub fn coordinates(&self) -> Result<Coordinates, PrayerError> {
        Coordinates::new(self.latitude, self.longitude)
    }

    pub fn tz(&self) -> Result<Tz, PrayerError> {
        parse_timezone(self.timezone)
    }
}

pub fn parse_timezone(name: &str) -> Result<Tz, PrayerError> {
    name.parse::<Tz>()
        .map_err(|_| PrayerError::InvalidTimezone(name.to_string()))
}

pub fn find_country(name: &str) -> Option<&'static Country> {
    let query = normalize(name);
    CATALOG
        .iter()
        .find(|c| matches(&query, c.name, c.aliases))
}

/// Resolve a country and optional city.
///
/// A missing or unknown city falls back to the capital; an unknown country
/// is an error.
pub fn resolve(country: &str, city: Option<&str>) -> Result<ResolvedLocation, PrayerError> {
    let entry =
        find_country(country).ok_or_else(|| PrayerError::UnknownLocation(country.to_string()))?;
    let chosen = match city.map(str::trim).filter(|c| !c.is_empty()) {
        None => entry.capital(),
        Some(name) => entry.city(name).unwrap_or_else(|| {
            warn!("unknown city '{name}' in {}, using {}", entry.name, entry.capital().name);
            entry.capital()
        }),
    };
    Ok(ResolvedLocation {
        country: entry.name.to_string(),
        city: chosen.name.to_string(),
        coordinates: chosen.coordinates()?,
        timezone: chosen.tz()?,
        method: entry.method,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_resolve_city() {
        let makkah = resolve("Saudi Arabia", Some("mecca")).unwrap();
        assert_eq!(makkah.city, "Makkah");
        assert_eq!(makkah.timezone, chrono_tz::Asia::Riyadh);
        assert_eq!(makkah.method, CalculationMethod::UmmAlQura);
    }

    #[test]
    fn test_lookup_ignores_case_and_spacing() {
        let salt = resolve("JORDAN", Some("as-salt")).unwrap();
        assert_eq!(salt.city, "As Salt");
        let abu_dhabi = resolve("uae", Some("AbuDhabi")).unwrap();
        assert_eq!(abu_dhabi.city, "Abu Dhabi");
    }

    #[test]
    fn test_arabic_names() {
        let amman = resolve("الأردن", Some("عمان")).unwrap();
        assert_eq!(amman.city, "Amman");
        assert_eq!(amman.method, CalculationMethod::Jordan);
    }

    #[test]
    fn test_country_only_falls_back_to_capital() {
        assert_eq!(resolve("Egypt", None).unwrap().city, "Cairo");
        assert_eq!(resolve("Jordan", Some("Atlantis")).unwrap().city, "Amman");
        assert_eq!(resolve("Turkey", Some("")).unwrap().city, "Ankara");
    }

    #[test]
    fn test_unknown_country() {
        assert!(matches!(
            resolve("Narnia", None),
            Err(PrayerError::UnknownLocation(_))
        ));
    }

    #[test]
    fn test_catalog_entries_are_valid() {
        for country in countries() {
            assert!(!country.cities.is_empty(), "{} has no cities", country.name);
            for city in country.cities {
                assert!(city.coordinates().is_ok(), "{}", city.name);
                assert!(city.tz().is_ok(), "{} timezone {}", city.name, city.timezone);
            }
        }
    }

    #[test]
    fn test_parse_timezone() {
        assert_eq!(parse_timezone("Asia/Amman").unwrap(), chrono_tz::Asia::Amman);
        assert!(parse_timezone("Mars/Olympus").is_err());
    }
}
