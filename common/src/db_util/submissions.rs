use super::*;

table! {
    submissions (id) {
        id -> BigInt,
        competition -> Varchar,
        name -> Varchar,
        f1_score -> Double,
        submission_time -> Timestamptz,
        model_description -> Varchar,
    }
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = submissions)]
struct SubmissionPrivate {
    id: i64,
    #[allow(dead_code)]
    competition: String,
    name: String,
    f1_score: f64,
    submission_time: DateTime<Utc>,
    model_description: String,
}

#[derive(Insertable)]
#[diesel(table_name = submissions)]
struct SubmissionPrivateNew<'a> {
    competition: &'a str,
    name: String,
    f1_score: f64,
    submission_time: DateTime<Utc>,
    model_description: String,
}

fn private_to_public(p: SubmissionPrivate) -> Result<SubmissionRecord, StoreError> {
    use conversions::*;
    Ok(SubmissionRecord {
        submission_id: i64_to_u64(p.id)?,
        participant_name: p.name,
        model_description: p.model_description,
        score: f64_to_score(p.f1_score)?,
        submitted_at: p.submission_time,
    })
}

fn build_new_row(competition: &str, new: NewSubmission) -> SubmissionPrivateNew<'_> {
    SubmissionPrivateNew {
        competition,
        name: new.participant_name,
        f1_score: new.score,
        submission_time: new.submitted_at,
        model_description: new.model_description,
    }
}

pub fn insert_submission(
    conn: &mut PgConnection,
    input_competition: &str,
    new_submission: NewSubmission,
) -> Result<SubmissionRecord, StoreError> {
    use self::submissions::dsl::*;

    let insert_row = build_new_row(input_competition, new_submission);

    let inserted: SubmissionPrivate = diesel::insert_into(submissions)
        .values(&insert_row)
        .returning(SubmissionPrivate::as_returning())
        .get_result(conn)?;
    private_to_public(inserted)
}

pub fn get_submissions_by_competition(
    conn: &mut PgConnection,
    input_competition: &str,
) -> Result<Vec<SubmissionRecord>, StoreError> {
    use self::submissions::dsl::*;

    let items_private: Vec<SubmissionPrivate> = submissions
        .filter(competition.eq(input_competition))
        .select(SubmissionPrivate::as_select())
        .load(conn)?;

    items_private
        .into_iter()
        .map(private_to_public)
        .collect::<Result<Vec<SubmissionRecord>, StoreError>>()
}

pub fn get_competitions(conn: &mut PgConnection) -> Result<Vec<String>, StoreError> {
    use self::submissions::dsl::*;

    Ok(submissions
        .select(competition)
        .distinct()
        .order(competition.asc())
        .load(conn)?)
}
