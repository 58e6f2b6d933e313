use dotdeps::{
    classify::AssemblySource,
    redirect::{BindingRedirect, BindingRedirects, VersionRange},
    AnalysisResult,
};

use super::{is_single_local, name_groups};

/// One redirect per conflicting name, from the lowest referenced version to the highest
/// version that was found.
pub fn redirects(result: &AnalysisResult) -> BindingRedirects {
    let mut redirects = BindingRedirects::new();

    for mut group in name_groups(result) {
        if is_single_local(&group) {
            continue;
        }

        group.sort_by(|a, b| b.identity().version.cmp(&a.identity().version));
        let (Some(highest), Some(lowest)) = (group.first(), group.last()) else {
            continue;
        };
        let Some(target) = group
            .iter()
            .find(|node| node.source() != AssemblySource::NotFound)
            .map(|node| node.identity())
        else {
            continue;
        };

        redirects.push(BindingRedirect {
            name: target.name.clone(),
            public_key_token: target.public_key_token,
            culture: target.culture.clone(),
            old_version: VersionRange::new(lowest.identity().version, highest.identity().version),
            new_version: target.version,
        });
    }

    redirects
}

/// The `<runtime>` section holding [`redirects`].
pub fn render(result: &AnalysisResult) -> anyhow::Result<String> {
    Ok(redirects(result).to_config_xml()?)
}
