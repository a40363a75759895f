//! Planning: the ordered rule list for one package
//!
//! Every plan starts with the rules that apply to all packages (login
//! block, observer callsign, Hoppie code) followed by the region's rules
//! from the registry.

use std::path::PathBuf;

use airac_rules::{Delimiter, RuleAction, TransformRule};
use serde::Serialize;

use crate::package::PackageInfo;
use crate::regions::RegionRegistry;
use crate::scope::TreeScope;
use crate::settings::Settings;

/// Profile definition files carrying the observer callsign.
pub const OBSERVER_TARGET: &str = "**/Settings/**/*Profil*.txt";

/// TopSky CPDLC logon code file.
pub const HOPPIE_TARGET: &str = "**/Plugins/TopSkyCPDLChoppieCode.txt";

/// What a run is going to do for one package.
#[derive(Debug, Clone, Serialize)]
pub struct PipelinePlan {
    pub region: String,
    pub package: PackageInfo,
    pub install_root: PathBuf,
    pub scope: TreeScope,
    /// Always-applied rules first, then the region's rules
    pub actions: Vec<RuleAction>,
    /// Problems noticed while planning (unknown region, missing initials)
    pub warnings: Vec<String>,
}

impl PipelinePlan {
    pub fn build(settings: &Settings, registry: &RegionRegistry, package: PackageInfo) -> Self {
        let region = package.region.clone();
        let mut warnings = Vec::new();

        let mut actions: Vec<RuleAction> = vec![login_rule(settings).into()];
        match observer_rule(settings) {
            Some(rule) => actions.push(rule.into()),
            None => warnings.push("No initials configured; observer callsign left unchanged".to_string()),
        }
        if let Some(rule) = hoppie_rule(settings) {
            actions.push(rule.into());
        }

        let region_rules = registry.rules_for(&region);
        if let Some(diagnostic) = region_rules.diagnostic {
            warnings.push(diagnostic);
        }
        actions.extend(region_rules.actions);

        tracing::info!(region = %region, rules = actions.len(), "Plan ready");
        Self {
            install_root: settings.install_root(&region),
            scope: TreeScope::for_region(&region, settings.options.use_subdirs),
            region,
            package,
            actions,
            warnings,
        }
    }
}

/// Credentials and VCCS settings in every profile. Only existing lines change.
pub fn login_rule(settings: &Settings) -> TransformRule {
    let login = &settings.login;
    let mut rule = TransformRule::matching("login", "*.prf")
        .delimiter(Delimiter::Tab)
        .set("LastSession\trealname", &login.name)
        .set("LastSession\tcertificate", login.cid.trim())
        .set("LastSession\tpassword", &login.password)
        .set("LastSession\trating", login.rating.to_string())
        .set("LastSession\tserver", "AUTOMATIC")
        .set("LastSession\ttovatsim", "1")
        .set("TeamSpeakVccs\tTs3NickName", login.cid.trim());

    let vccs = &settings.vccs;
    let optional = [
        ("Ts3G2GPtt", &vccs.ptt),
        ("PlaybackMode", &vccs.mode),
        ("PlaybackDevice", &vccs.playback),
        ("CaptureMode", &vccs.mode),
        ("CaptureDevice", &vccs.capture),
    ];
    for (key, value) in optional {
        if let Some(value) = value.as_deref().filter(|v| !v.trim().is_empty()) {
            rule = rule.set(format!("TeamSpeakVccs\t{}", key), value);
        }
    }
    rule
}

pub fn observer_rule(settings: &Settings) -> Option<TransformRule> {
    let callsign = settings.observer_callsign()?;
    Some(
        TransformRule::matching("observer callsign", OBSERVER_TARGET)
            .replace_literal(r"PROFILE:.+_OBS:", format!("PROFILE:{}:", callsign)),
    )
}

/// The code replaces the first line of the file.
pub fn hoppie_rule(settings: &Settings) -> Option<TransformRule> {
    let code = settings.hoppie_code()?;
    Some(
        TransformRule::matching("hoppie code", HOPPIE_TARGET)
            .replace_literal(r"\A[^\r\n]*", code)
            .optional(),
    )
}
