use anyhow::Result;
use std::path::Path;

use crate::{
    export::{build_mapping, read_chains, write_mapping},
    runtime::Runtime,
};

use super::Config;

/// Write the `externalId -> identifier` table known from a chain export.
#[tracing::instrument(skip(config))]
pub fn make_doi_map<R: Runtime>(config: &Config<R>, input: &Path, output: &Path) -> Result<()> {
    let records = read_chains(&config.read_file(input)?)?;
    let pairs = build_mapping(&records);
    config.write_file(output, &write_mapping(&pairs)?)?;
    println!("Wrote {} mappings to {:?}", pairs.len(), output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{CHAINS, config};
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_make_doi_map() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("chains.csv");
        let output = dir.path().join("map.csv");
        std::fs::write(&input, CHAINS).unwrap();

        make_doi_map(&config("http://127.0.0.1:9"), &input, &output).unwrap();

        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "doi,pid\ndoi:10.6073/a,edi/1/1\ndoi:10.6073/b,edi/1/2\n"
        );
    }
}
