use author_flux::adapters::TwitterStatusAdapter;
use author_flux::circular::{angle_to_time, time_to_angle, HOURS_PER_DAY};
use author_flux::encoder::FeatureEncoder;
use author_flux::schema::RecordFormat;
use author_flux::{
    author_time_statistics, FeatureConfig, FeatureError, FeatureProcessor, LanguageSelection,
    RecordAdapter, TimeSelection, UNSET_TIMESTAMP,
};
use pretty_assertions::assert_eq;

const POSTS_CSV: &str = "\
tweetid,userid,tweet_language,tweet_text,tweet_time,is_retweet,like_count,hashtags,urls,user_mentions
1,night_owl,en,Late night thoughts,2017-02-03 23:00,False,1,[],[],[]
2,night_owl,en,Early start,2017-02-04 01:00,False,3,[],[],[]
3,night_owl,es,Hola amigos,2017-02-04 03:00,True,,[],[],[amigo]
4,night_owl,es,Buenas noches,2017-02-04 03:30,True,,[],[],[]
5,lurker,en,Nothing to see,1900-01-01 00:00,False,0,[],[],[]
6,shift_worker,fr,Bonjour,2017-02-04 07:10,False,0,[],[],[]
7,shift_worker,fr,Encore,2017-02-04 07:55,False,0,[],[],[]
8,shift_worker,fr,Pause,2017-02-04 15:00,False,0,[],[],[]
";

#[test]
fn csv_dataset_to_feature_table() {
    let posts = RecordAdapter::parse_posts(POSTS_CSV, RecordFormat::Csv).unwrap();
    let table = FeatureProcessor::default().process(&posts, &[]).unwrap();

    let ids: Vec<&str> = table.rows.iter().map(|r| r.author_id.as_str()).collect();
    assert_eq!(ids, vec!["night_owl", "lurker", "shift_worker"]);

    let owl = &table.rows[0];
    assert_eq!(owl.time.count, Some(4));
    assert_eq!(owl.time.earliest, Some(100));
    assert_eq!(owl.time.latest, Some(2300));
    let modes = owl.time.mode_hours.unwrap();
    // 03:00 and 03:30 make hour 3 the only mode
    assert_eq!(modes[3], 1);
    assert_eq!(modes.iter().map(|&m| m as u32).sum::<u32>(), 1);
    assert_eq!(owl.activity.retweet_ratio, 0.5);
    assert_eq!(owl.activity.language_ratio, 0.5);

    let lurker = &table.rows[1];
    assert!(lurker.time.is_missing());
    assert!(lurker.activity.avg_posts_per_week.is_nan());

    let worker = &table.rows[2];
    let modes = worker.time.mode_hours.unwrap();
    assert_eq!(modes[7], 1);
    assert_eq!(modes[15], 0);
    assert_eq!(worker.time.earliest, Some(710));
    assert_eq!(worker.activity.language_ratio, 0.0);
}

#[test]
fn language_filter_modes() {
    let posts = RecordAdapter::parse_posts(POSTS_CSV, RecordFormat::Csv).unwrap();
    let selection = |m, n| {
        LanguageSelection::new(
            "en",
            &TimeSelection {
                include_matching: m,
                include_non_matching: n,
            },
        )
    };

    let english = author_time_statistics(&posts, ["night_owl"], &selection(true, false), &UNSET_TIMESTAMP)
        .unwrap();
    assert_eq!(english[0].count, Some(2));
    assert_eq!(english[0].mean, Some(0));

    let other = author_time_statistics(&posts, ["night_owl"], &selection(false, true), &UNSET_TIMESTAMP)
        .unwrap();
    assert_eq!(other[0].count, Some(2));
    assert_eq!(other[0].earliest, Some(300));
    assert_eq!(other[0].latest, Some(330));

    let err = author_time_statistics(&posts, ["night_owl"], &selection(false, false), &UNSET_TIMESTAMP)
        .unwrap_err();
    assert!(matches!(err, FeatureError::InvalidLanguageSelection));
}

#[test]
fn csv_output_has_nan_for_missing_rows() {
    let posts = RecordAdapter::parse_posts(POSTS_CSV, RecordFormat::Csv).unwrap();
    let table = FeatureProcessor::default().process(&posts, &[]).unwrap();
    let csv_text = FeatureEncoder::new().encode_to_csv(&table).unwrap();

    let lurker_line = csv_text.lines().find(|l| l.starts_with("lurker,")).unwrap();
    let fields: Vec<&str> = lurker_line.split(',').collect();
    assert!(fields[1..7 + HOURS_PER_DAY].iter().all(|f| *f == "NaN"));
}

#[test]
fn twitter_payload_end_to_end() {
    let raw = r#"{"statuses": [
        {"id": 10, "text": "Morning news", "created_at": "Tue Oct 09 08:00:00 +0000 2018",
         "lang": "en", "user": {"id": 1, "screen_name": "a"}},
        {"id": 11, "text": "Evening news", "created_at": "Tue Oct 09 20:00:00 +0000 2018",
         "lang": "en", "user": {"id": 1}}
    ]}"#;

    let processor = FeatureProcessor::new(FeatureConfig::default());
    let table = processor.process_payload(&TwitterStatusAdapter, raw).unwrap();
    assert_eq!(table.len(), 1);

    let row = &table.rows[0];
    assert_eq!(row.author_id, "1");
    assert_eq!(row.time.count, Some(2));
    assert_eq!(row.time.earliest, Some(800));
    assert_eq!(row.time.latest, Some(2000));
    // Linear median of 120° and 300° is 210°, i.e. 14:00
    assert_eq!(row.time.median, Some(140));
    assert_eq!(row.bag_of_words.token_count(), 4);
}

#[test]
fn concatenated_encoding_is_preserved() {
    assert_eq!(angle_to_time(time_to_angle(905)), Some(95));
    assert_eq!(angle_to_time(time_to_angle(1905)), Some(195));
    assert_eq!(angle_to_time(time_to_angle(1959)), Some(1959));
}
