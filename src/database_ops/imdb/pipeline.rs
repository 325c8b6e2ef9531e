use anyhow::Result;
use std::path::PathBuf;
use tracing::{info, instrument, warn};

use super::context::RunContext;
use super::files::{SourceDir, SourceFile};
use super::stage::Stage;
use super::{catalogs, crew, entities, relations, updates};
use crate::database_ops::batch_loader::BatchLoader;
use crate::database_ops::phase::RunSummary;
use crate::database_ops::sink::RowSink;

#[derive(Debug, Clone)]
pub struct ImdbSettings {
    pub source_dir: PathBuf,
    pub batch_size: usize,
    pub entity_batch_size: usize,
    pub chunk_rows: usize,
}

/// Load every IMDB dump in dependency order: dictionaries, entities,
/// relationships, then the cross-cutting updates.
///
/// Degraded phases are reported in the summary; only losing the database for
/// good returns an error.
#[instrument(skip_all, fields(source_dir = %settings.source_dir.display()))]
pub async fn run<S: RowSink>(settings: &ImdbSettings, sink: &mut S) -> Result<RunSummary> {
    let sources = SourceDir::new(&settings.source_dir);
    for file in SourceFile::ALL {
        if !sources.path(file).is_file() {
            warn!(source = file.file_name(), "source file not found");
        }
    }

    let mut stage = Stage {
        sources: &sources,
        sink,
        loader: BatchLoader::new(settings.batch_size),
        entity_loader: BatchLoader::new(settings.entity_batch_size),
        chunk_rows: settings.chunk_rows,
    };
    let mut ctx = RunContext::new();
    let mut summary = RunSummary::default();

    summary.push(catalogs::load_professions(&mut stage, &mut ctx).await?);
    summary.push(catalogs::load_genres(&mut stage, &mut ctx).await?);
    summary.push(catalogs::load_title_types(&mut stage, &mut ctx).await?);
    summary.push(catalogs::load_attributes(&mut stage, &mut ctx).await?);

    summary.push(entities::load_persons(&mut stage, &mut ctx).await?);
    summary.push(entities::load_titles(&mut stage, &mut ctx).await?);
    info!(
        persons = ctx.persons.len(),
        titles = ctx.titles.len(),
        "entities materialized"
    );

    summary.push(relations::load_person_professions(&mut stage, &ctx).await?);
    summary.push(relations::load_title_genres(&mut stage, &ctx).await?);
    summary.push(relations::load_title_names(&mut stage, &ctx).await?);
    summary.push(relations::load_title_name_attributes(&mut stage, &ctx).await?);
    summary.push(crew::load_principal_credits(&mut stage, &mut ctx).await?);
    summary.push(crew::load_crew_credits(&mut stage, &mut ctx).await?);
    summary.push(relations::load_characters(&mut stage, &ctx).await?);
    summary.push(relations::load_episodes(&mut stage, &ctx).await?);

    summary.push(updates::apply_ratings(&mut stage, &ctx).await?);
    summary.push(updates::apply_known_for(&mut stage, &ctx).await?);

    summary.log();
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database_ops::phase::PhaseOutcome;
    use crate::database_ops::rows::SinkRow;
    use crate::database_ops::sink::DryRunSink;
    use std::collections::BTreeMap;
    use std::fs;
    use std::path::Path;

    /// Keeps the Debug form of every row so tests can look at what was written.
    #[derive(Default)]
    struct RecordingSink {
        tables: BTreeMap<&'static str, Vec<String>>,
    }

    impl RecordingSink {
        fn rows(&self, table: &str) -> &[String] {
            self.tables.get(table).map(Vec::as_slice).unwrap_or(&[])
        }
    }

    #[async_trait::async_trait]
    impl RowSink for RecordingSink {
        async fn keep_alive(&mut self) -> Result<()> {
            Ok(())
        }

        async fn reconnect(&mut self) -> Result<()> {
            Ok(())
        }

        async fn write_batch<R: SinkRow>(&mut self, rows: &[R]) -> Result<u64> {
            self.tables
                .entry(R::TABLE)
                .or_default()
                .extend(rows.iter().map(|r| format!("{r:?}")));
            Ok(rows.len() as u64)
        }
    }

    fn write(dir: &Path, file: SourceFile, lines: &[&str]) {
        fs::write(dir.join(file.file_name()), lines.join("\n") + "\n").unwrap();
    }

    fn fixture(dir: &Path) {
        write(
            dir,
            SourceFile::NameBasics,
            &[
                "nconst\tprimaryName\tbirthYear\tdeathYear\tprimaryProfession\tknownForTitles",
                "nm0000001\tFred Astaire\t1899\t1987\tsoundtrack,actor,miscellaneous\ttt0000001,tt0000002",
                "nm0000002\tLauren Bacall\t1924\t2014\tactress,soundtrack\ttt0000002",
                "nmBROKEN\tNobody\t\\N\t\\N\tactor\t\\N",
            ],
        );
        write(
            dir,
            SourceFile::TitleBasics,
            &[
                "tconst\ttitleType\tprimaryTitle\toriginalTitle\tisAdult\tstartYear\tendYear\truntimeMinutes\tgenres",
                "tt0000001\tshort\tCarmencita\tCarmencita\t0\t1894\t\\N\t1\tDocumentary,Short",
                "tt0000002\ttvSeries\tThe Show\tThe Show\t0\t1950\t1955\t30\tComedy",
            ],
        );
        write(
            dir,
            SourceFile::TitleAkas,
            &[
                "titleId\tordering\ttitle\tregion\tlanguage\ttypes\tattributes\tisOriginalTitle",
                "tt0000001\t1\tCarmencita\tUS\t\\N\timdbDisplay\t\\N\t0",
                "tt0000001\t2\tCarmencita - spanyol tánc\tHU\t\\N\timdbDisplay\u{2}working\tliteral title\t0",
                "tt0000009\t1\tMiss Jerry\tUS\t\\N\toriginal\t\\N\t1",
            ],
        );
        write(
            dir,
            SourceFile::TitlePrincipals,
            &[
                "tconst\tordering\tnconst\tcategory\tjob\tcharacters",
                "tt0000001\t1\tnm0000001\tself\t\\N\t[\"Self\"]",
                "tt0000001\t3\tnm0000005\tdirector\t\\N\t\\N",
                "tt0000002\t1\tnm0000002\tactress\t\\N\t[\"Slim\",\"Marie\"]",
            ],
        );
        write(
            dir,
            SourceFile::TitleCrew,
            &[
                "tconst\tdirectors\twriters",
                "tt0000001\tnm0000005,nm0000007\tnm0000008",
                "tt0000002\t\\N\tnm0000002",
            ],
        );
        write(
            dir,
            SourceFile::TitleEpisode,
            &[
                "tconst\tparentTconst\tseasonNumber\tepisodeNumber",
                "tt0000010\ttt0000002\t1\t1",
            ],
        );
        write(
            dir,
            SourceFile::TitleRatings,
            &[
                "tconst\taverageRating\tnumVotes",
                "tt0000001\t5.7\t2000",
                "tt0000002\tbad\t10",
            ],
        );
    }

    fn settings(dir: &Path) -> ImdbSettings {
        ImdbSettings {
            source_dir: dir.to_path_buf(),
            batch_size: 2,
            entity_batch_size: 3,
            chunk_rows: 2,
        }
    }

    #[tokio::test]
    async fn full_run_resolves_every_reference() {
        let dir = tempfile::tempdir().unwrap();
        fixture(dir.path());
        let mut sink = RecordingSink::default();
        let summary = run(&settings(dir.path()), &mut sink).await.unwrap();

        assert!(summary.is_complete(), "{:?}", summary.degraded().collect::<Vec<_>>());

        // nm1, nm2 from basics; nm5, nm7, nm8 as stubs
        assert_eq!(sink.rows("persons").len(), 5);
        assert_eq!(summary.get("persons").unwrap().rows_dropped, 1);
        // tt1, tt2 from basics; tt9 (akas) and tt10 (episode) as stubs
        let titles = sink.rows("titles");
        assert_eq!(titles.len(), 4);
        let carmencita: Vec<&String> = titles.iter().filter(|t| t.contains("id: 1,")).collect();
        assert_eq!(carmencita.len(), 1);
        assert!(carmencita[0].contains("Some(\"Carmencita\")"));

        // two principals with valid persons on tt1 plus one on tt2
        let credits = sink.rows("title_credits");
        assert!(credits.iter().any(|c| c.contains("title_id: 1, ordinal: 3, person_id: 5")));
        // nm7 directs and nm8 writes tt1; nm5 is already credited
        assert!(credits.iter().any(|c| c.contains("title_id: 1, ordinal: 4, person_id: 7")));
        assert!(credits.iter().any(|c| c.contains("title_id: 1, ordinal: 5, person_id: 8")));
        assert_eq!(credits.len(), 5);
        // tt1 is the only rating that parses; nm1 knows two titles and nm2 one
        assert_eq!(sink.rows("titles.ratings").len(), 1);
        assert_eq!(sink.rows("title_credits.known_for").len(), 3);

        assert_eq!(sink.rows("characters").len(), 3);
        assert_eq!(sink.rows("episodes").len(), 1);
        assert_eq!(summary.get("ratings").unwrap().rows_dropped, 1);
        assert_eq!(sink.rows("title_names").len(), 3);
        assert!(sink.rows("title_types").iter().any(|t| t.contains("id: 0, label: \"Unknown\"")));
    }

    #[tokio::test]
    async fn missing_sources_degrade_without_aborting() {
        let dir = tempfile::tempdir().unwrap();
        fixture(dir.path());
        fs::remove_file(dir.path().join(SourceFile::TitleEpisode.file_name())).unwrap();
        fs::remove_file(dir.path().join(SourceFile::TitleRatings.file_name())).unwrap();

        let mut sink = DryRunSink::new();
        let summary = run(&settings(dir.path()), &mut sink).await.unwrap();

        assert!(matches!(
            summary.get("episodes").unwrap().outcome,
            PhaseOutcome::Failed { .. }
        ));
        assert!(matches!(
            summary.get("titles").unwrap().outcome,
            PhaseOutcome::Partial { .. }
        ));
        assert!(summary.get("known_for").unwrap().outcome.is_completed());
        // the sentinel is written even though nothing references it
        assert!(sink.rows("title_types") >= 1);
        assert_eq!(sink.rows("titles"), 3);
    }
}
