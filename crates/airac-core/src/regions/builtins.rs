//! Built-in region registrations
//!
//! Layout rules position windows and lists for a three-screen setup. All
//! paths are relative to the install root.

use airac_rules::{Delimiter, RuleAction, TransformRule};

use super::RegionRegistration;

/// Number of built-in regions.
pub const BUILTIN_COUNT: usize = 7;

const AERO_NAV: &str = "https://files.aero-nav.com";

/// Returns all built-in region registrations.
pub fn builtin_registrations() -> Vec<RegionRegistration> {
    vec![
        RegionRegistration::new("BIRD", "Reykjavik", no_layout)
            .with_download(
                &format!("{AERO_NAV}/SCA"),
                r"https://files\.aero-nav\.com/BIRD/Install-Pack_.*\.zip",
            )
            .with_renames(&[("BIRD_TopSky.prf", "BIRD FIR - OCA.prf")]),
        RegionRegistration::new("EDGG", "Langen", edgg).with_download(
            &format!("{AERO_NAV}/EDXX"),
            r"https://files\.aero-nav\.com/EDGG/Full.*Package_.*\.zip",
        ),
        RegionRegistration::new("EDMM", "Muenchen", edmm)
            .with_download(
                &format!("{AERO_NAV}/EDXX"),
                r"https://files\.aero-nav\.com/EDMM/Full.*Package_.*\.zip",
            )
            .with_renames(&[
                ("iCAS2.prf", "EDMM FIR - Muenchen iCAS2.prf"),
                ("TWR_PHX_DAY.prf", "EDMM FIR - TWR PHX Day.prf"),
                ("TWR_PHX_NIGHT.prf", "EDMM FIR - TWR PHX Night.prf"),
            ]),
        RegionRegistration::new("EDWW", "Bremen", edww).with_download(
            &format!("{AERO_NAV}/EDXX"),
            r"https://files\.aero-nav\.com/EDWW/Full.*Package_.*\.zip",
        ),
        RegionRegistration::new("EDXX", "Germany FIS", edxx)
            .with_download(
                &format!("{AERO_NAV}/EDXX"),
                r"https://files\.aero-nav\.com/EDXX/FIS_.*\.zip",
            )
            .with_renames(&[("FIS.prf", "EDXX FIS.prf")]),
        RegionRegistration::new("EXCXO", "Oceanic", excxo)
            .with_download(
                &format!("{AERO_NAV}/EXCXO"),
                r"https://files\.aero-nav\.com/EXCXO/EXCXO-Install_.*\.zip",
            )
            .with_renames(&[("OCA TopSky.prf", "EXCXO FSS - OCA.prf")]),
        RegionRegistration::new("LPPO", "Santa Maria", no_layout)
            .with_download(
                &format!("{AERO_NAV}/LPPO"),
                r"https://files\.aero-nav\.com/LPPO/Install-Package_.*\.zip",
            )
            .with_renames(&[
                ("LPPO.prf", "LPPO FIR.prf"),
                ("LPPO_TS.prf", "LPPO FIR - OCA.prf"),
            ]),
    ]
}

/// Rules every registered region starts with: the VCCS mini control
/// placement, moved further left on tower profiles.
pub fn shared_rules() -> Vec<RuleAction> {
    vec![
        TransformRule::matching("VCCS mini position", "*.prf")
            .excluding("*TWR*")
            .delimiter(Delimiter::Tab)
            .set("TsVccsMiniControlX", "2181")
            .set("TsVccsMiniControlY", "26")
            .into(),
        TransformRule::matching("VCCS mini position (TWR)", "*.prf")
            .filtered("*TWR*")
            .delimiter(Delimiter::Tab)
            .set("TsVccsMiniControlX", "1327")
            .set("TsVccsMiniControlY", "26")
            .into(),
    ]
}

fn no_layout() -> Vec<RuleAction> {
    Vec::new()
}

/// `key:value` screen file update.
fn screen(name: &str, path: &str, values: &[(&str, &str)]) -> RuleAction {
    assign(TransformRule::file(name, path).delimiter(Delimiter::Colon), values)
}

/// `key=value` TopSky settings update.
fn topsky(name: &str, path: &str, values: &[(&str, &str)]) -> RuleAction {
    assign(TransformRule::file(name, path).delimiter(Delimiter::Equals), values)
}

fn assign(rule: TransformRule, values: &[(&str, &str)]) -> RuleAction {
    values
        .iter()
        .fold(rule, |rule, (key, value)| rule.set(*key, *value))
        .into()
}

fn edgg() -> Vec<RuleAction> {
    vec![
        screen(
            "Langen radar screen",
            "EDGG/Settings/EDGG/EDGG_Screen.txt",
            &[
                ("m_ScreenNumber", "0"),
                ("m_ScreenPosition", "0"),
                ("m_ScreenMaximized", "0"),
                ("m_MetarListX", "1431"),
                ("m_MetarListY", "45"),
                ("m_ControllerListX", "1536"),
                ("m_ControllerListY", "232"),
            ],
        ),
        topsky(
            "Langen TopSky windows",
            "EDGG/Plugins/Topsky/EDGG/TopSkySettings.txt",
            &[
                ("Window_QNHTL", "0,1422,974"),
                ("Window_CARD", "0,1350,1180"),
                ("Window_LFUNCFP", "0,1536,45"),
                ("Window_CPDLC_Current", "0,0,650"),
                ("Window_CPDLC_Setting", "1,0,650"),
            ],
        ),
        screen(
            "PHX screen",
            "EDGG/Settings/PHX/PHX_Screen.txt",
            &[
                ("m_ScreenNumber", "0"),
                ("m_ScreenPosition", "0"),
                ("m_ScreenMaximized", "0"),
                ("m_MetarListX", "713"),
                ("m_ControllerListX", "713"),
                ("m_ControllerListY", "77"),
                ("m_MetarListY", "45"),
                ("m_VoiceListX", "1857"),
                ("m_VoiceListY", "381"),
            ],
        ),
        screen(
            "PHX night symbology",
            "EDGG/Settings/PHX/PHX_Symbology_Night.txt",
            &[
                ("Datablock:AC list background", "0:3.2:0:0:7"),
                ("Other:list header", "11447982:3.5:0:0:7"),
                ("Controller:normal", "16777215:3.5:0:0:7"),
                ("Controller:breaking", "4227327:3.5:0:0:7"),
                ("Controller:timeout", "255:4.0:0:0:7"),
                ("Metar:normal", "11447982:3.5:0:0:7"),
                ("Metar:modified", "33023:3.5:0:0:7"),
                ("Metar:timeout", "255:3.5:0:0:7"),
                ("Other:freetext", "8454143:3.5:0:1:7"),
                ("Chat:background", "0:3.5:0:0:7"),
                ("Chat:name normal", "10790052:3.5:0:0:7"),
                ("Chat:name unread", "16777215:3.5:0:0:7"),
            ],
        ),
        screen(
            "Active airports by sector",
            "EDGG/Settings/EDGG_General.txt",
            &[("SET_SetActiveAptBySectors", "1")],
        ),
        // Drop the preset ATIS type and leave an empty parameter instead;
        // the optional group keeps a second run from adding another one
        TransformRule::matching("ATIS URL", "EDGG_*.prf")
            .replace(r"&atistype=.{3}&", "&")
            .replace(r"(?:&atistype=)?&depfreq=", "&atistype=&depfreq=")
            .into(),
    ]
}

fn edmm() -> Vec<RuleAction> {
    let layout = [
        ("m_ScreenNumber", "0"),
        ("m_ScreenPosition", "6"),
        ("m_ScreenMaximized", "0"),
        ("m_MetarListX", "1431"),
        ("m_MetarListY", "45"),
        ("m_ControllerListX", "1574"),
        ("m_ControllerListY", "45"),
    ];
    vec![
        screen("iCAS2 screen", "EDMM/Settings/iCAS2/Screen.txt", &layout),
        screen("TWR PHX screen", "EDMM/Settings/TWR_PHX/Screen.txt", &layout),
    ]
}

fn edww() -> Vec<RuleAction> {
    let position = [
        ("m_ScreenNumber", "0"),
        ("m_ScreenPosition", "6"),
        ("m_ScreenMaximized", "0"),
    ];
    let mut rules: Vec<RuleAction> = ["EDWW", "EDUU", "EDYY", "PHX"]
        .iter()
        .map(|sector| {
            screen(
                &format!("{sector} screen"),
                &format!("EDWW/Settings/Settings {sector}/SCREEN.txt"),
                &position,
            )
        })
        .collect();

    rules.push(screen(
        "EDWW lists",
        "EDWW/Settings/Settings EDWW/SCREEN.txt",
        &[
            ("m_MetarListX", "1431"),
            ("m_MetarListY", "45"),
            ("m_ControllerListX", "1574"),
            ("m_ControllerListY", "45"),
        ],
    ));
    rules.push(topsky(
        "Bremen TopSky windows",
        "EDWW/Plugins/TOPSKY EDWW/TopSkySettings.txt",
        &[
            ("Window_MsgIn", "1,0,900"),
            ("Window_CARD", "3,1350,1180"),
            ("Window_CPDLC_Current", "1,0,650"),
            ("Window_CPDLC_Setting", "1,368,650"),
        ],
    ));
    rules
}

fn edxx() -> Vec<RuleAction> {
    vec![
        screen(
            "FIS screen",
            "EDXX/Settings/Screen.txt",
            &[
                ("m_ScreenNumber", "0"),
                ("m_ScreenPosition", "6"),
                ("m_ScreenMaximized", "0"),
                ("m_MetarListX", "1328"),
                ("m_MetarListY", "45"),
                ("m_ControllerListX", "2337"),
                ("m_ControllerListY", "45"),
            ],
        ),
        screen(
            "Airport name colour",
            "EDXX/Settings/Symbology.txt",
            &[("Airports:name", "11053224:3.5:0:0:1")],
        ),
        topsky(
            "FIS TopSky windows",
            "EDXX/Plugins/TopSky/TopSkySettings.txt",
            &[
                ("Window_QNHTL", "3,1422,974"),
                ("Window_FlightPlanSelect", "3,500,45"),
            ],
        ),
    ]
}

fn excxo() -> Vec<RuleAction> {
    vec![screen(
        "Oceanic screen",
        "EXCXO/Settings/Screen Layout.txt",
        &[
            ("m_ScreenNumber", "0"),
            ("m_ScreenPosition", "9"),
            ("m_ScreenMaximized", "0"),
            ("m_ControllerListX", "3281"),
            ("m_ControllerListY", "45"),
        ],
    )]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regions::RegionRegistry;
    use airac_rules::{DiskStore, RuleEngine, apply_rule};
    use std::collections::HashSet;

    #[test]
    fn builtin_count_matches() {
        assert_eq!(builtin_registrations().len(), BUILTIN_COUNT);
        let ids: HashSet<_> = builtin_registrations().into_iter().map(|r| r.id).collect();
        assert_eq!(ids.len(), BUILTIN_COUNT);
    }

    #[test]
    fn every_region_downloads_and_compiles() {
        for registration in builtin_registrations() {
            let source = registration.download.as_ref().unwrap();
            assert!(regex::Regex::new(&source.link_pattern).is_ok(), "{}", registration.id);
            for action in registration.layout_rules() {
                if let RuleAction::Transform(rule) = action {
                    for replacement in &rule.replacements {
                        assert!(regex::Regex::new(&replacement.pattern).is_ok());
                    }
                }
            }
        }
    }

    #[test]
    fn regions_without_layout_still_get_shared_rules() {
        let registry = RegionRegistry::with_builtins();
        let rules = registry.rules_for("LPPO");
        assert!(rules.known);
        assert_eq!(rules.actions.len(), shared_rules().len());
    }

    /// A line assigning `key` in the format `delimiter` reads.
    fn line(delimiter: Delimiter, key: &str) -> String {
        match delimiter {
            Delimiter::Equals => format!("{}=0\r\n", key),
            Delimiter::Colon => format!("{}:0\r\n", key),
            Delimiter::Tab => format!("{}\t0\r\n", key),
        }
    }

    /// Seed a tree with every file a region's rules name, each carrying
    /// every key the rules assign in it, plus tower and radar profiles.
    fn seed(root: &std::path::Path, actions: &[RuleAction]) {
        let mut files: std::collections::BTreeMap<String, String> = [
            ("EDMM/EDMM_TWR.prf", "TsVccsMiniControlX\t0\r\nTsVccsMiniControlY\t0\r\n"),
            ("EDMM/EDMM_APP.prf", "TsVccsMiniControlX\t0\r\nTsVccsMiniControlY\t0\r\n"),
        ]
        .into_iter()
        .map(|(path, content)| (path.to_string(), content.to_string()))
        .collect();
        for action in actions {
            let RuleAction::Transform(rule) = action else {
                continue;
            };
            if rule.target.contains(['*', '?', '[']) {
                continue;
            }
            let content = files.entry(rule.target.clone()).or_default();
            for assignment in &rule.assignments {
                content.push_str(&line(rule.delimiter, &assignment.key));
            }
        }
        for (path, content) in files {
            let native = root.join(path);
            std::fs::create_dir_all(native.parent().unwrap()).unwrap();
            std::fs::write(native, content).unwrap();
        }
    }

    #[test]
    fn every_region_rule_set_is_idempotent() {
        let registry = RegionRegistry::with_builtins();
        let engine = RuleEngine::new();
        for registration in builtin_registrations() {
            let temp = tempfile::TempDir::new().unwrap();
            let actions = registry.rules_for(&registration.id).actions;
            seed(temp.path(), &actions);
            let mut store = DiskStore::new(temp.path());

            for action in &actions {
                engine.apply(action, &mut store).unwrap();
            }
            let mut second = Vec::new();
            for action in &actions {
                second.extend(engine.apply(action, &mut store).unwrap().modified);
            }
            assert!(second.is_empty(), "{}: {:?}", registration.id, second);
        }
    }

    #[test]
    fn tower_profiles_keep_their_own_position() {
        let temp = tempfile::TempDir::new().unwrap();
        let actions = shared_rules();
        seed(temp.path(), &actions);
        let mut store = DiskStore::new(temp.path());
        let engine = RuleEngine::new();
        for action in &actions {
            engine.apply(action, &mut store).unwrap();
        }

        let tower = std::fs::read_to_string(temp.path().join("EDMM/EDMM_TWR.prf")).unwrap();
        let radar = std::fs::read_to_string(temp.path().join("EDMM/EDMM_APP.prf")).unwrap();
        assert_eq!(tower, "TsVccsMiniControlX\t1327\r\nTsVccsMiniControlY\t26\r\n");
        assert_eq!(radar, "TsVccsMiniControlX\t2181\r\nTsVccsMiniControlY\t26\r\n");
    }

    #[test]
    fn atis_fix_is_idempotent() {
        let temp = tempfile::TempDir::new().unwrap();
        let prf = temp.path().join("EDGG_APP.prf");
        std::fs::write(
            &prf,
            "Plugins\tAtis\thttp://atis.example/?arr=$arrrwy&atistype=ARR&depfreq=$freq\r\n",
        )
        .unwrap();

        let Some(RuleAction::Transform(rule)) = edgg().pop() else {
            panic!("last EDGG rule is the ATIS fix");
        };
        assert_eq!(apply_rule(&rule, temp.path()).unwrap().len(), 1);
        let once = std::fs::read_to_string(&prf).unwrap();
        assert_eq!(
            once,
            "Plugins\tAtis\thttp://atis.example/?arr=$arrrwy&atistype=&depfreq=$freq\r\n"
        );
        assert!(apply_rule(&rule, temp.path()).unwrap().is_empty());
    }
}
