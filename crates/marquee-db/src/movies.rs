use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rusqlite::types::{ToSql, Type};
use rusqlite::{OptionalExtension, Row, params};
use tracing::{debug, error, warn};

use marquee_types::filters::{Filters, Metadata, calculate_metadata};
use marquee_types::models::{Movie, Runtime};

use crate::{DataError, Database, Result};

const MOVIE_COLUMNS: &str = "id, created_at, title, year, runtime, genres, version";

impl Database {
    // -- Movies --

    /// Insert `movie`, filling in the id, creation time and initial version.
    pub async fn insert_movie(&self, movie: &mut Movie) -> Result<()> {
        let mut record = movie.clone();
        let genres = encode_genres(&record.genres)?;

        let record = self
            .run("insert_movie", move |conn| {
                let (id, created_at, version): (i64, DateTime<Utc>, i32) = conn.query_row(
                    "INSERT INTO movies (created_at, title, year, runtime, genres)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     RETURNING id, created_at, version",
                    params![Utc::now(), record.title, record.year, record.runtime.minutes(), genres],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )?;
                record.id = id;
                record.created_at = created_at;
                record.version = version;
                Ok(record)
            })
            .await?;

        debug!(id = record.id, "movie inserted");
        *movie = record;
        Ok(())
    }

    pub async fn get_movie(&self, id: i64) -> Result<Movie> {
        if id < 1 {
            return Err(DataError::RecordNotFound);
        }

        self.run("get_movie", move |conn| {
            conn.query_row(
                &format!("SELECT {MOVIE_COLUMNS} FROM movies WHERE id = ?1"),
                [id],
                |row| movie_from_row(row, 0),
            )
            .optional()?
            .ok_or(DataError::RecordNotFound)
        })
        .await
    }

    /// Write `movie` back if nobody has changed it since it was read.
    ///
    /// The write only lands when the stored version still equals
    /// `movie.version`; otherwise (including when the row is gone) the result
    /// is `EditConflict` and the caller should re-read before retrying. On
    /// success `movie.version` is advanced to the stored value.
    pub async fn update_movie(&self, movie: &mut Movie) -> Result<()> {
        let record = movie.clone();
        let genres = encode_genres(&record.genres)?;

        let version: i32 = self
            .run("update_movie", move |conn| {
                conn.query_row(
                    "UPDATE movies
                     SET title = ?1, year = ?2, runtime = ?3, genres = ?4, version = version + 1
                     WHERE id = ?5 AND version = ?6
                     RETURNING version",
                    params![
                        record.title,
                        record.year,
                        record.runtime.minutes(),
                        genres,
                        record.id,
                        record.version
                    ],
                    |row| row.get(0),
                )
                .optional()?
                .ok_or(DataError::EditConflict)
            })
            .await
            .inspect_err(|e| {
                if matches!(e, DataError::EditConflict) {
                    warn!(id = movie.id, version = movie.version, "movie update lost a version race");
                }
            })?;

        movie.version = version;
        Ok(())
    }

    pub async fn delete_movie(&self, id: i64) -> Result<()> {
        if id < 1 {
            return Err(DataError::RecordNotFound);
        }

        self.run("delete_movie", move |conn| {
            match conn.execute("DELETE FROM movies WHERE id = ?1", [id])? {
                0 => Err(DataError::RecordNotFound),
                _ => Ok(()),
            }
        })
        .await
    }

    /// One page of movies whose title contains every word of `title` and
    /// whose genres include all of `genres`, plus pagination metadata.
    ///
    /// An empty `title` or `genres` does not filter. Ties on the sort column
    /// are broken by ascending id.
    pub async fn get_all_movies(
        &self,
        title: &str,
        genres: &[String],
        filters: &Filters,
    ) -> Result<(Vec<Movie>, Metadata)> {
        let column = filters.sort_column().map_err(|e| {
            error!("{e}; sort values must be validated before listing");
            DataError::from(e)
        })?;
        let direction = filters.sort_direction();
        let (limit, offset) = filters.paging().map_err(|e| {
            error!("{e}; paging values must be validated before listing");
            DataError::from(e)
        })?;

        let title_query = match TitleSearch::parse(title) {
            TitleSearch::Any => None,
            TitleSearch::Words(query) => Some(query),
            TitleSearch::Nothing => return Ok((Vec::new(), Metadata::default())),
        };
        let wanted_genres = distinct(genres);
        let genres_json = encode_genres(&wanted_genres)?;

        let mut conditions: Vec<&str> = Vec::new();
        if title_query.is_some() {
            conditions.push("id IN (SELECT rowid FROM movies_fts WHERE movies_fts MATCH :title)");
        }
        if !wanted_genres.is_empty() {
            conditions.push(
                "NOT EXISTS (SELECT 1 FROM json_each(:genres) AS wanted
                             WHERE wanted.value NOT IN (SELECT value FROM json_each(movies.genres)))",
            );
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        // `column` and `direction` come from the static safelist; everything
        // else is a bound parameter.
        let sql = format!(
            "SELECT count(*) OVER(), {MOVIE_COLUMNS}
             FROM movies
             {where_clause}
             ORDER BY {column} {direction}, id ASC
             LIMIT :limit OFFSET :offset"
        );

        let (page, page_size) = (filters.page, filters.page_size);

        self.run("get_all_movies", move |conn| {
            let mut named: Vec<(&str, &dyn ToSql)> = Vec::with_capacity(4);
            named.push((":limit", &limit));
            named.push((":offset", &offset));
            if let Some(query) = title_query.as_ref() {
                named.push((":title", query));
            }
            if !wanted_genres.is_empty() {
                named.push((":genres", &genres_json));
            }

            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(named.as_slice())?;

            let mut total_records = 0;
            let mut movies = Vec::new();
            while let Some(row) = rows.next()? {
                total_records = row.get(0)?;
                movies.push(movie_from_row(row, 1)?);
            }

            debug!(returned = movies.len(), total_records, "movies listed");
            Ok((movies, calculate_metadata(total_records, page, page_size)))
        })
        .await
    }
}

/// How a free-text title search maps onto the full-text index.
#[derive(Debug, PartialEq, Eq)]
enum TitleSearch {
    /// Empty search: every title matches.
    Any,
    /// FTS5 query requiring each word. Words are quoted so FTS syntax in the
    /// input (`OR`, `NEAR`, `*`, column filters) is matched literally.
    Words(String),
    /// Non-empty search with no words in it: nothing matches.
    Nothing,
}

impl TitleSearch {
    fn parse(term: &str) -> Self {
        if term.is_empty() {
            return Self::Any;
        }

        let words: Vec<String> = term
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(|w| format!("\"{w}\""))
            .collect();

        if words.is_empty() {
            Self::Nothing
        } else {
            Self::Words(words.join(" "))
        }
    }
}

/// First occurrence of each genre, in the order given.
fn distinct(genres: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    genres
        .iter()
        .filter(|g| seen.insert(g.as_str()))
        .cloned()
        .collect()
}

fn encode_genres(genres: &[String]) -> Result<String> {
    serde_json::to_string(genres).map_err(|e| DataError::CorruptRow(e.to_string()))
}

/// Map the seven movie columns starting at `offset`.
fn movie_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Movie> {
    let genres_json: String = row.get(offset + 5)?;
    let genres = serde_json::from_str(&genres_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(offset + 5, Type::Text, Box::new(e))
    })?;

    Ok(Movie {
        id: row.get(offset)?,
        created_at: row.get(offset + 1)?,
        title: row.get(offset + 2)?,
        year: row.get(offset + 3)?,
        runtime: Runtime(row.get(offset + 4)?),
        genres,
        version: row.get(offset + 6)?,
    })
}
