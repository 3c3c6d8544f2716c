//! Cross-table consistency checks for the static catalog.

use cmip_catalog::{
    month_period, ArchiveUri, Experiment, Model, TemporalResolution, Variable, DEFAULT_MIRRORS,
};

#[test]
fn test_every_supported_pair_builds_a_uri() {
    for model in Model::ALL {
        for variable in Variable::ALL {
            if variable.temporal_resolution(model) == TemporalResolution::Unsupported {
                continue;
            }
            let uri = ArchiveUri::daily(
                model,
                Experiment::for_year(2020),
                variable.short_name(),
                variable.version(model, true),
                month_period(2020, 1).unwrap(),
            )
            .to_string();
            assert!(uri.starts_with("HighResMIP/"), "{uri}");
            assert!(uri.ends_with("_20200101-20200131.nc"), "{uri}");
            assert!(uri.contains(model.source_name()));
        }
    }
}

#[test]
fn test_monthly_models() {
    let monthly: Vec<_> = Model::ALL
        .into_iter()
        .flat_map(|m| Variable::ALL.into_iter().map(move |v| (m, v)))
        .filter(|(m, v)| v.temporal_resolution(*m) == TemporalResolution::Monthly)
        .collect();
    assert_eq!(
        monthly,
        vec![
            (Model::CMCC_CM2_VHR4, Variable::Windspeed10mMean),
            (Model::CMCC_CM2_VHR4, Variable::Windspeed10mMax),
        ]
    );
}

#[test]
fn test_serde_names() {
    let json = serde_json::to_string(&Model::FGOALS_f3_H).unwrap();
    assert_eq!(json, "\"FGOALS_f3_H\"");
    let variable: Variable = serde_json::from_str("\"relative_humidity_2m_mean\"").unwrap();
    assert_eq!(variable, Variable::RelativeHumidity2mMean);
    let resolution = serde_json::to_string(&TemporalResolution::Unsupported).unwrap();
    assert_eq!(resolution, "\"unsupported\"");
}

#[test]
fn test_mirror_bases_end_with_slash() {
    for mirror in DEFAULT_MIRRORS {
        assert!(mirror.starts_with("https://"));
        assert!(mirror.ends_with('/'));
    }
}
